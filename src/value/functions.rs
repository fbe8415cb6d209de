use std::collections::HashMap;
use std::rc::Rc;

use super::{
    environment::Environment,
    native_function::Call,
    values::{Callable, Value},
};
use crate::error::RuntimeError;
use crate::expr::{FunDecl, Token};
use crate::gc::{Heap, HeapId};
use crate::interpreter::{Flow, Interpreter};

#[derive(Clone, Debug)]
pub struct Function {
    pub decl: Rc<FunDecl>,
    pub closure: HeapId,
    pub is_initializer: bool,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.decl.name.lexeme
    }

    /// Returns a copy of this function whose closure is a fresh frame holding
    /// `this`, chained to the original closure.
    pub fn bind(&self, heap: &mut Heap, instance_id: HeapId) -> HeapId {
        let env = heap.manage_env(Environment::with_enclosing(self.closure));
        heap.define(env, "this", Value::Instance(instance_id));
        heap.manage_function(Function {
            decl: Rc::clone(&self.decl),
            closure: env,
            is_initializer: self.is_initializer,
        })
    }
}

impl Call for Function {
    fn arity(&self, _interpreter: &Interpreter) -> usize {
        self.decl.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
        let env = interpreter
            .heap
            .manage_env(Environment::with_enclosing(self.closure));
        for (param, arg) in self.decl.params.iter().zip(args.iter()) {
            interpreter.heap.define(env, &param.lexeme, arg.clone());
        }

        let flow = interpreter.execute_block(&self.decl.body, env)?;

        if self.is_initializer {
            // `init` always hands back the instance, whatever it returned.
            return Ok(interpreter
                .heap
                .get_env(self.closure)
                .lookup("this")
                .cloned()
                .unwrap_or(Value::Nil));
        }

        match flow {
            Flow::Return(val) => Ok(val),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Class {
    pub name: String,
    pub methods: HashMap<String, HeapId>,
}

impl Class {
    pub fn find_method(&self, method_name: &str) -> Option<HeapId> {
        self.methods.get(method_name).copied()
    }

    fn init(&self, heap: &Heap) -> Option<Function> {
        self.find_method("init")
            .map(|initializer_id| heap.get_function(initializer_id).clone())
    }

    pub fn arity(&self, heap: &Heap) -> usize {
        match self.init(heap) {
            Some(initializer) => initializer.decl.params.len(),
            None => 0,
        }
    }

    /// Allocates a new instance of the class `class_id` and runs its
    /// initializer, if any. The instance is always the result.
    pub fn instantiate(
        class_id: HeapId,
        interpreter: &mut Interpreter,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let instance_id = interpreter.heap.manage_instance(Instance::new(class_id));

        let initializer = interpreter.heap.get_class(class_id).init(&interpreter.heap);
        if let Some(initializer) = initializer {
            let bound_id = initializer.bind(&mut interpreter.heap, instance_id);
            let bound = interpreter.heap.get_function(bound_id).clone();
            bound.call(interpreter, args)?;
        }

        Ok(Value::Instance(instance_id))
    }
}

#[derive(Clone, Debug)]
pub struct Instance {
    pub class_id: HeapId,
    pub fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class_id: HeapId) -> Instance {
        Instance {
            class_id,
            fields: HashMap::new(),
        }
    }

    /// Fields shadow methods. Every method access binds a fresh function.
    pub fn getattr(heap: &mut Heap, instance_id: HeapId, attr: &Token) -> Result<Value, RuntimeError> {
        let instance = heap.get_instance(instance_id);
        if let Some(val) = instance.fields.get(&attr.lexeme) {
            return Ok(val.clone());
        }

        let method_id = heap
            .get_class(instance.class_id)
            .find_method(&attr.lexeme);
        match method_id {
            Some(method_id) => {
                let method = heap.get_function(method_id).clone();
                let bound_id = method.bind(heap, instance_id);
                Ok(Value::Callable(Callable::Function(bound_id)))
            }
            None => Err(RuntimeError::UndefinedProperty { name: attr.clone() }),
        }
    }

    pub fn setattr(heap: &mut Heap, instance_id: HeapId, attr: &Token, val: Value) {
        heap.get_instance_mut(instance_id)
            .fields
            .insert(attr.lexeme.clone(), val);
    }
}

impl Call for Callable {
    fn arity(&self, interpreter: &Interpreter) -> usize {
        match self {
            Callable::Native(native) => native.arity(interpreter),
            Callable::Function(id) => interpreter.heap.get_function(*id).arity(interpreter),
            Callable::Class(id) => interpreter.heap.get_class(*id).arity(&interpreter.heap),
        }
    }

    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
        match self {
            Callable::Native(native) => native.call(interpreter, args),
            Callable::Function(id) => {
                let function = interpreter.heap.get_function(*id).clone();
                function.call(interpreter, args)
            }
            Callable::Class(id) => Class::instantiate(*id, interpreter, args),
        }
    }
}
