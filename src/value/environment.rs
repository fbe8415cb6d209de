use std::collections::HashMap;

use super::values::Value;
use crate::error::RuntimeError;
use crate::expr::Token;
use crate::gc::{Heap, HeapId};

/// One scope frame. Frames live on the heap and point at their enclosing
/// frame by handle, so a frame captured by a closure stays shared with
/// every other holder.
#[derive(Debug, Default, Clone)]
pub struct Environment {
    enclosing: Option<HeapId>,
    venv: HashMap<String, Value>,
}

impl Environment {
    pub fn with_enclosing(enclosing: HeapId) -> Environment {
        Environment {
            enclosing: Some(enclosing),
            venv: HashMap::new(),
        }
    }

    pub fn enclosing(&self) -> Option<HeapId> {
        self.enclosing
    }

    pub fn define(&mut self, name: &str, val: Value) {
        self.venv.insert(name.to_string(), val);
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.venv.get(name)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.venv.values()
    }

    fn assign_local(&mut self, name: &str, val: Value) -> bool {
        match self.venv.get_mut(name) {
            Some(slot) => {
                *slot = val;
                true
            }
            None => false,
        }
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::UndefinedVariable { name: name.clone() }
}

impl Heap {
    pub fn define(&mut self, env: HeapId, name: &str, val: Value) {
        self.get_env_mut(env).define(name, val);
    }

    /// Searches `env` and then each enclosing frame.
    pub fn get(&self, env: HeapId, name: &Token) -> Result<Value, RuntimeError> {
        let mut current = Some(env);
        while let Some(id) = current {
            let frame = self.get_env(id);
            if let Some(val) = frame.lookup(&name.lexeme) {
                return Ok(val.clone());
            }
            current = frame.enclosing();
        }
        Err(undefined(name))
    }

    /// Overwrites the nearest existing binding. Never creates one.
    pub fn assign(&mut self, env: HeapId, name: &Token, val: Value) -> Result<(), RuntimeError> {
        let mut current = Some(env);
        while let Some(id) = current {
            let frame = self.get_env_mut(id);
            if frame.venv.contains_key(&name.lexeme) {
                frame.assign_local(&name.lexeme, val);
                return Ok(());
            }
            current = frame.enclosing();
        }
        Err(undefined(name))
    }

    pub fn ancestor(&self, env: HeapId, distance: usize) -> Option<HeapId> {
        let mut current = env;
        for _ in 0..distance {
            current = self.get_env(current).enclosing()?;
        }
        Some(current)
    }

    /// Reads `name` from exactly the frame `distance` links out, without
    /// searching further.
    pub fn get_at(&self, env: HeapId, distance: usize, name: &Token) -> Result<Value, RuntimeError> {
        self.ancestor(env, distance)
            .and_then(|frame| self.get_env(frame).lookup(&name.lexeme).cloned())
            .ok_or_else(|| undefined(name))
    }

    pub fn assign_at(
        &mut self,
        env: HeapId,
        distance: usize,
        name: &Token,
        val: Value,
    ) -> Result<(), RuntimeError> {
        let frame = self.ancestor(env, distance).ok_or_else(|| undefined(name))?;
        if self.get_env_mut(frame).assign_local(&name.lexeme, val) {
            Ok(())
        } else {
            Err(undefined(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::Identifier, name, 1, 0)
    }

    fn chain(heap: &mut Heap) -> (HeapId, HeapId, HeapId) {
        let global = heap.manage_env(Environment::default());
        let middle = heap.manage_env(Environment::with_enclosing(global));
        let inner = heap.manage_env(Environment::with_enclosing(middle));
        (global, middle, inner)
    }

    #[test]
    fn get_searches_outward() {
        let mut heap = Heap::new(1024);
        let (global, _, inner) = chain(&mut heap);
        heap.define(global, "x", Value::Number(1.0));
        assert_eq!(heap.get(inner, &ident("x")), Ok(Value::Number(1.0)));
    }

    #[test]
    fn define_shadows_and_overwrites() {
        let mut heap = Heap::new(1024);
        let (global, middle, inner) = chain(&mut heap);
        heap.define(global, "x", Value::Number(1.0));
        heap.define(middle, "x", Value::Number(2.0));
        heap.define(middle, "x", Value::Number(3.0));
        assert_eq!(heap.get(inner, &ident("x")), Ok(Value::Number(3.0)));
        assert_eq!(heap.get(global, &ident("x")), Ok(Value::Number(1.0)));
    }

    #[test]
    fn get_undefined_fails() {
        let mut heap = Heap::new(1024);
        let (_, _, inner) = chain(&mut heap);
        assert_eq!(
            heap.get(inner, &ident("nope")),
            Err(RuntimeError::UndefinedVariable { name: ident("nope") })
        );
    }

    #[test]
    fn assign_mutates_nearest_binding() {
        let mut heap = Heap::new(1024);
        let (global, middle, inner) = chain(&mut heap);
        heap.define(global, "x", Value::Number(1.0));
        heap.define(middle, "x", Value::Number(2.0));
        heap.assign(inner, &ident("x"), Value::Number(5.0)).unwrap();
        assert_eq!(heap.get_at(inner, 1, &ident("x")), Ok(Value::Number(5.0)));
        assert_eq!(heap.get(global, &ident("x")), Ok(Value::Number(1.0)));
    }

    #[test]
    fn assign_never_creates_a_binding() {
        let mut heap = Heap::new(1024);
        let (global, _, inner) = chain(&mut heap);
        assert!(heap.assign(inner, &ident("y"), Value::Nil).is_err());
        assert!(heap.get(global, &ident("y")).is_err());
    }

    #[test]
    fn get_at_ignores_intermediate_shadowing() {
        let mut heap = Heap::new(1024);
        let (global, middle, inner) = chain(&mut heap);
        heap.define(global, "a", Value::String("outer".into()));
        heap.define(middle, "a", Value::String("shadow".into()));
        assert_eq!(
            heap.get_at(inner, 2, &ident("a")),
            Ok(Value::String("outer".into()))
        );
        heap.assign_at(inner, 2, &ident("a"), Value::Bool(true)).unwrap();
        assert_eq!(heap.get(global, &ident("a")), Ok(Value::Bool(true)));
        assert_eq!(
            heap.get_at(inner, 1, &ident("a")),
            Ok(Value::String("shadow".into()))
        );
    }

    #[test]
    fn get_at_does_not_search_past_the_target_frame() {
        let mut heap = Heap::new(1024);
        let (global, _, inner) = chain(&mut heap);
        heap.define(global, "a", Value::Nil);
        assert!(heap.get_at(inner, 1, &ident("a")).is_err());
        assert!(heap.get_at(inner, 5, &ident("a")).is_err());
        assert!(heap.assign_at(inner, 0, &ident("a"), Value::Nil).is_err());
    }

    #[test]
    fn ancestor_walks_exact_links() {
        let mut heap = Heap::new(1024);
        let (global, middle, inner) = chain(&mut heap);
        assert_eq!(heap.ancestor(inner, 0), Some(inner));
        assert_eq!(heap.ancestor(inner, 1), Some(middle));
        assert_eq!(heap.ancestor(inner, 2), Some(global));
        assert_eq!(heap.ancestor(inner, 3), None);
    }
}
