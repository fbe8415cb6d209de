use std::collections::HashMap;

use tracing::debug;

use crate::value::{Callable, Class, Environment, Function, Instance, Value};

enum GCData {
    Environment(Environment),
    Function(Function),
    Class(Class),
    Instance(Instance),
}

pub struct GCVal {
    is_marked: bool,
    data: GCData,
}

impl GCVal {
    fn from(data: GCData) -> GCVal {
        GCVal {
            is_marked: false,
            data,
        }
    }
}

pub type HeapId = usize;

/// Owner of every environment frame, function, class and instance.
///
/// Handles are never reused, so a handle that survives a collection keeps
/// naming the same object.
pub struct Heap {
    allocated_since_gc: usize,
    next_gc: usize,
    id_counter: usize,
    values: HashMap<HeapId, GCVal>,
}

impl Heap {
    pub fn new(next_gc: usize) -> Heap {
        Heap {
            allocated_since_gc: 0,
            next_gc: next_gc.max(1),
            id_counter: 0,
            values: Default::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, id: HeapId) -> bool {
        self.values.contains_key(&id)
    }

    pub fn manage_env(&mut self, env: Environment) -> HeapId {
        self.manage(GCData::Environment(env))
    }

    pub fn manage_function(&mut self, function: Function) -> HeapId {
        self.manage(GCData::Function(function))
    }

    pub fn manage_class(&mut self, class: Class) -> HeapId {
        self.manage(GCData::Class(class))
    }

    pub fn manage_instance(&mut self, inst: Instance) -> HeapId {
        self.manage(GCData::Instance(inst))
    }

    fn manage(&mut self, data: GCData) -> HeapId {
        self.allocated_since_gc += 1;
        let id = self.generate_id();
        self.values.insert(id, GCVal::from(data));
        id
    }

    fn generate_id(&mut self) -> HeapId {
        self.id_counter += 1;
        self.id_counter
    }

    fn get_gcval(&self, id: HeapId) -> &GCVal {
        match self.values.get(&id) {
            Some(val) => val,
            None => panic!("Internal interpreter error! no heap value with id {}.", id),
        }
    }

    fn get_gcval_mut(&mut self, id: HeapId) -> &mut GCVal {
        match self.values.get_mut(&id) {
            Some(val) => val,
            None => panic!("Internal interpreter error! no heap value with id {}.", id),
        }
    }

    pub fn get_env(&self, id: HeapId) -> &Environment {
        match &self.get_gcval(id).data {
            GCData::Environment(env) => env,
            _ => panic!("Internal interpreter error! heap value {} is not an environment.", id),
        }
    }

    pub fn get_env_mut(&mut self, id: HeapId) -> &mut Environment {
        match &mut self.get_gcval_mut(id).data {
            GCData::Environment(env) => env,
            _ => panic!("Internal interpreter error! heap value {} is not an environment.", id),
        }
    }

    pub fn get_function(&self, id: HeapId) -> &Function {
        match &self.get_gcval(id).data {
            GCData::Function(function) => function,
            _ => panic!("Internal interpreter error! heap value {} is not a function.", id),
        }
    }

    pub fn get_class(&self, id: HeapId) -> &Class {
        match &self.get_gcval(id).data {
            GCData::Class(class) => class,
            _ => panic!("Internal interpreter error! heap value {} is not a class.", id),
        }
    }

    pub fn get_instance(&self, id: HeapId) -> &Instance {
        match &self.get_gcval(id).data {
            GCData::Instance(inst) => inst,
            _ => panic!("Internal interpreter error! heap value {} is not an instance.", id),
        }
    }

    pub fn get_instance_mut(&mut self, id: HeapId) -> &mut Instance {
        match &mut self.get_gcval_mut(id).data {
            GCData::Instance(inst) => inst,
            _ => panic!("Internal interpreter error! heap value {} is not an instance.", id),
        }
    }

    pub fn unmark(&mut self) {
        for val in self.values.values_mut() {
            val.is_marked = false;
        }
    }

    pub fn mark(&mut self, id: HeapId) {
        self.get_gcval_mut(id).is_marked = true;
    }

    pub fn is_marked(&self, id: HeapId) -> bool {
        self.get_gcval(id).is_marked
    }

    pub fn children(&self, id: HeapId) -> Vec<HeapId> {
        match &self.get_gcval(id).data {
            GCData::Environment(env) => env
                .enclosing()
                .into_iter()
                .chain(env.values().filter_map(Heap::extract_id))
                .collect(),
            GCData::Function(function) => vec![function.closure],
            GCData::Class(class) => class.methods.values().copied().collect(),
            GCData::Instance(instance) => std::iter::once(instance.class_id)
                .chain(instance.fields.values().filter_map(Heap::extract_id))
                .collect(),
        }
    }

    pub fn extract_id(val: &Value) -> Option<HeapId> {
        match val {
            Value::Number(_) => None,
            Value::Bool(_) => None,
            Value::String(_) => None,
            Value::Nil => None,
            Value::Callable(Callable::Native(_)) => None,
            Value::Callable(Callable::Function(id)) => Some(*id),
            Value::Callable(Callable::Class(id)) => Some(*id),
            Value::Instance(id) => Some(*id),
        }
    }

    pub fn sweep(&mut self) -> usize {
        let before = self.values.len();
        self.values.retain(|_, val| val.is_marked);
        before - self.values.len()
    }

    pub fn should_collect(&self) -> bool {
        self.allocated_since_gc >= self.next_gc
    }

    /// Marks everything reachable from `roots` and frees the rest. Returns
    /// the number of freed values.
    pub fn collect(&mut self, roots: &[HeapId]) -> usize {
        self.unmark();

        let mut gray_stack: Vec<HeapId> = Vec::new();
        for &root in roots {
            if !self.is_marked(root) {
                self.mark(root);
                gray_stack.push(root);
            }
        }

        while let Some(id) = gray_stack.pop() {
            for child in self.children(id) {
                if !self.is_marked(child) {
                    self.mark(child);
                    gray_stack.push(child);
                }
            }
        }

        let freed = self.sweep();
        self.allocated_since_gc = 0;
        debug!(freed, live = self.values.len(), "collected garbage");
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{FunDecl, Token, TokenType};
    use std::rc::Rc;

    fn decl(name: &str) -> Rc<FunDecl> {
        Rc::new(FunDecl {
            name: Token::new(TokenType::Identifier, name, 1, 0),
            params: vec![],
            body: vec![],
        })
    }

    #[test]
    fn handles_are_not_reused() {
        let mut heap = Heap::new(1);
        let a = heap.manage_env(Environment::default());
        let b = heap.manage_env(Environment::default());
        heap.collect(&[b]);
        let c = heap.manage_env(Environment::default());
        assert!(!heap.contains(a));
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn collect_keeps_reachable_and_frees_the_rest() {
        let mut heap = Heap::new(1);
        let globals = heap.manage_env(Environment::default());
        let class_id = heap.manage_class(Class {
            name: "A".to_string(),
            methods: HashMap::new(),
        });
        let kept = heap.manage_instance(Instance::new(class_id));
        let dropped = heap.manage_instance(Instance::new(class_id));
        let orphan_env = heap.manage_env(Environment::with_enclosing(globals));
        heap.define(globals, "a", Value::Instance(kept));

        assert_eq!(heap.collect(&[globals]), 2);
        assert!(heap.contains(globals));
        assert!(heap.contains(kept));
        assert!(heap.contains(class_id));
        assert!(!heap.contains(dropped));
        assert!(!heap.contains(orphan_env));
    }

    #[test]
    fn collect_handles_cycles_through_closures() {
        let mut heap = Heap::new(1);
        let globals = heap.manage_env(Environment::default());
        let class_id = heap.manage_class(Class {
            name: "A".to_string(),
            methods: HashMap::new(),
        });
        let instance = heap.manage_instance(Instance::new(class_id));
        let scope = heap.manage_env(Environment::with_enclosing(globals));
        heap.define(scope, "obj", Value::Instance(instance));
        let function = heap.manage_function(Function {
            decl: decl("f"),
            closure: scope,
            is_initializer: false,
        });
        heap.get_instance_mut(instance)
            .fields
            .insert("f".to_string(), Value::Callable(Callable::Function(function)));

        // Unreachable cycle: instance -> function -> scope -> instance.
        assert_eq!(heap.collect(&[globals]), 4);
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn class_methods_keep_their_closures_alive() {
        let mut heap = Heap::new(1);
        let globals = heap.manage_env(Environment::default());
        let method = heap.manage_function(Function {
            decl: decl("m"),
            closure: globals,
            is_initializer: false,
        });
        let mut methods = HashMap::new();
        methods.insert("m".to_string(), method);
        let class_id = heap.manage_class(Class {
            name: "A".to_string(),
            methods,
        });
        heap.define(globals, "A", Value::Callable(Callable::Class(class_id)));

        assert_eq!(heap.collect(&[globals]), 0);
        assert!(heap.contains(method));
    }

    #[test]
    fn should_collect_counts_allocations_since_last_collection() {
        let mut heap = Heap::new(2);
        let root = heap.manage_env(Environment::default());
        assert!(!heap.should_collect());
        heap.manage_env(Environment::default());
        assert!(heap.should_collect());
        heap.collect(&[root]);
        assert!(!heap.should_collect());
    }
}
