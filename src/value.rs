// value.rs - The tagged value union shared by the stack, variables, and words

use crate::byte_buffer::ByteBuffer;
use crate::bytecode::ByteCode;
use crate::data_object::DataObject;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::lexer::Token;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

pub type ValueHashMap = HashMap<Value, Value>;

/// Every value a script can touch.  Scalar kinds are plain data; aggregate
/// kinds are shared references, so a `clone` hands out another handle to the
/// same storage and `deep_clone` copies the contents.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(Rc<String>),
    Token(Token),
    Array(Rc<RefCell<Vec<Value>>>),
    HashMap(Rc<RefCell<ValueHashMap>>),
    Data(Rc<RefCell<DataObject>>),
    Code(Rc<Vec<ByteCode>>),
    Buffer(Rc<RefCell<ByteBuffer>>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(Rc::new(value.to_string()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Rc::new(value))
    }
}

impl From<Token> for Value {
    fn from(value: Token) -> Self {
        Value::Token(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(value)))
    }
}

impl From<ValueHashMap> for Value {
    fn from(value: ValueHashMap) -> Self {
        Value::HashMap(Rc::new(RefCell::new(value)))
    }
}

impl From<DataObject> for Value {
    fn from(value: DataObject) -> Self {
        Value::Data(Rc::new(RefCell::new(value)))
    }
}

impl From<Vec<ByteCode>> for Value {
    fn from(value: Vec<ByteCode>) -> Self {
        Value::Code(Rc::new(value))
    }
}

impl From<ByteBuffer> for Value {
    fn from(value: ByteBuffer) -> Self {
        Value::Buffer(Rc::new(RefCell::new(value)))
    }
}

// ============================================================================
// KIND PREDICATES
// ============================================================================

impl Value {
    pub fn is_numeric(&self) -> bool {
        self.is_int() || self.is_float() || self.is_bool()
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Tokens count as strings: anywhere a string is accepted a bare token
    /// of source text works too.
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_) | Value::Token(_))
    }

    pub fn is_token(&self) -> bool {
        matches!(self, Value::Token(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_hash_map(&self) -> bool {
        matches!(self, Value::HashMap(_))
    }

    pub fn is_data_object(&self) -> bool {
        matches!(self, Value::Data(_))
    }

    pub fn is_byte_code(&self) -> bool {
        matches!(self, Value::Code(_))
    }

    pub fn is_byte_buffer(&self) -> bool {
        matches!(self, Value::Buffer(_))
    }

    pub fn either_is_numeric(a: &Value, b: &Value) -> bool {
        a.is_numeric() || b.is_numeric()
    }

    pub fn either_is_float(a: &Value, b: &Value) -> bool {
        a.is_float() || b.is_float()
    }

    pub fn either_is_string(a: &Value, b: &Value) -> bool {
        a.is_string() || b.is_string()
    }
}

// ============================================================================
// COERCIONS
// ============================================================================

impl Value {
    pub fn as_integer(&self, interpreter: &Interpreter) -> Result<i64> {
        match self {
            Value::Int(value) => Ok(*value),
            Value::Float(value) => Ok(*value as i64),
            Value::Bool(value) => Ok(*value as i64),
            _ => Err(interpreter.script_error("Value not convertible to integer.")),
        }
    }

    pub fn as_float(&self, interpreter: &Interpreter) -> Result<f64> {
        match self {
            Value::Int(value) => Ok(*value as f64),
            Value::Float(value) => Ok(*value),
            Value::Bool(value) => Ok(if *value { 1.0 } else { 0.0 }),
            _ => Err(interpreter.script_error("Value not convertible to float.")),
        }
    }

    pub fn as_boolean(&self, interpreter: &Interpreter) -> Result<bool> {
        match self {
            Value::Int(value) => Ok(*value > 0),
            Value::Float(value) => Ok(*value > 0.0),
            Value::Bool(value) => Ok(*value),
            Value::String(value) => Ok(!value.is_empty()),
            _ => Err(interpreter.script_error("Value not convertible to boolean.")),
        }
    }

    /// String conversion never fails; non-string values fall back to their
    /// display form.
    pub fn as_string(&self) -> String {
        match self {
            Value::String(value) => value.as_ref().clone(),
            Value::Token(token) => token.text.clone(),
            other => other.to_string(),
        }
    }

    pub fn as_token(&self, interpreter: &Interpreter) -> Result<Token> {
        match self {
            Value::Token(token) => Ok(token.clone()),
            _ => Err(interpreter.script_error("Value is not a token.")),
        }
    }

    pub fn as_array(&self, interpreter: &Interpreter) -> Result<Rc<RefCell<Vec<Value>>>> {
        match self {
            Value::Array(array) => Ok(array.clone()),
            _ => Err(interpreter.script_error("Value is not an array.")),
        }
    }

    pub fn as_hash_map(&self, interpreter: &Interpreter) -> Result<Rc<RefCell<ValueHashMap>>> {
        match self {
            Value::HashMap(map) => Ok(map.clone()),
            _ => Err(interpreter.script_error("Value is not a hash table.")),
        }
    }

    pub fn as_data_object(&self, interpreter: &Interpreter) -> Result<Rc<RefCell<DataObject>>> {
        match self {
            Value::Data(data) => Ok(data.clone()),
            _ => Err(interpreter.script_error("Value is not a data object.")),
        }
    }

    pub fn as_byte_code(&self, interpreter: &Interpreter) -> Result<Rc<Vec<ByteCode>>> {
        match self {
            Value::Code(code) => Ok(code.clone()),
            _ => Err(interpreter.script_error("Value is not byte code.")),
        }
    }

    pub fn as_byte_buffer(&self, interpreter: &Interpreter) -> Result<Rc<RefCell<ByteBuffer>>> {
        match self {
            Value::Buffer(buffer) => Ok(buffer.clone()),
            _ => Err(interpreter.script_error("Value is not a byte buffer.")),
        }
    }
}

// ============================================================================
// CLONING
// ============================================================================

impl Value {
    /// Copy a value so that no storage is shared with the original.  Scalars
    /// copy directly; aggregates copy element by element.
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::Array(array) => {
                let items: Vec<Value> = array.borrow().iter().map(Value::deep_clone).collect();
                Value::from(items)
            }

            Value::HashMap(map) => {
                let mut new_map = ValueHashMap::new();

                for (key, value) in map.borrow().iter() {
                    new_map.insert(key.deep_clone(), value.deep_clone());
                }

                Value::from(new_map)
            }

            Value::Data(data) => Value::from(data.borrow().deep_clone()),

            Value::Code(code) => Value::Code(Rc::new(code.as_ref().clone())),

            Value::Buffer(buffer) => Value::from(buffer.borrow().clone()),

            other => other.clone(),
        }
    }
}

// ============================================================================
// EQUALITY AND HASHING
// ============================================================================

// Scalar kinds compare structurally.  Arrays, hash maps, and bytecode blocks
// compare by identity, matching the original reference semantics; structures
// and buffers compare by content.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Token(a), Value::Token(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::HashMap(a), Value::HashMap(b)) => Rc::ptr_eq(a, b),
            (Value::Data(a), Value::Data(b)) => *a.borrow() == *b.borrow(),
            (Value::Code(a), Value::Code(b)) => Rc::ptr_eq(a, b),
            (Value::Buffer(a), Value::Buffer(b)) => *a.borrow() == *b.borrow(),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);

        match self {
            Value::Int(value) => value.hash(state),
            Value::Float(value) => value.to_bits().hash(state),
            Value::Bool(value) => value.hash(state),
            Value::String(value) => value.hash(state),
            Value::Token(token) => token.hash(state),
            Value::Array(array) => (Rc::as_ptr(array) as usize).hash(state),
            Value::HashMap(map) => (Rc::as_ptr(map) as usize).hash(state),
            Value::Data(data) => data.borrow().hash(state),
            Value::Code(code) => (Rc::as_ptr(code) as usize).hash(state),
            Value::Buffer(buffer) => buffer.borrow().hash(state),
        }
    }
}

// ============================================================================
// DISPLAY
// ============================================================================

impl Value {
    /// Quote and escape a string the way it would be written in source.
    pub fn stringify(text: &str) -> String {
        let mut output = String::from("\"");

        for next in text.chars() {
            match next {
                '\r' => output.push_str("\\r"),
                '\n' => output.push_str("\\n"),
                '\t' => output.push_str("\\t"),
                '"' => output.push_str("\\\""),
                _ => output.push(next),
            }
        }

        output.push('"');
        output
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
            Value::Bool(value) => write!(f, "{}", if *value { "true" } else { "false" }),
            Value::String(value) => write!(f, "{}", value),
            Value::Token(token) => write!(f, "{}", token.text),

            Value::Array(array) => {
                write!(f, "[ ")?;

                let items = array.borrow();

                for (i, item) in items.iter().enumerate() {
                    if item.is_string() {
                        write!(f, "{}", Value::stringify(&item.as_string()))?;
                    } else {
                        write!(f, "{}", item)?;
                    }

                    write!(f, "{}", if i < items.len() - 1 { " , " } else { " " })?;
                }

                write!(f, "]")
            }

            Value::HashMap(map) => {
                write!(f, "{{ ")?;

                let entries = map.borrow();
                let count = entries.len();

                for (i, (key, value)) in entries.iter().enumerate() {
                    let key_text = if key.is_string() {
                        Value::stringify(&key.as_string())
                    } else {
                        key.to_string()
                    };
                    let value_text = if value.is_string() {
                        Value::stringify(&value.as_string())
                    } else {
                        value.to_string()
                    };

                    write!(f, "{} -> {}", key_text, value_text)?;
                    write!(f, "{}", if i < count - 1 { " , " } else { " " })?;
                }

                write!(f, "}}")
            }

            Value::Data(data) => write!(f, "{}", data.borrow()),
            Value::Code(_) => write!(f, "<bytecode>"),
            Value::Buffer(buffer) => write!(f, "{}", buffer.borrow()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;

    #[test]
    fn test_coercions() {
        let interpreter = Interpreter::new();

        assert_eq!(Value::from(42).as_integer(&interpreter).unwrap(), 42);
        assert_eq!(Value::from(2.5).as_integer(&interpreter).unwrap(), 2);
        assert_eq!(Value::from(true).as_integer(&interpreter).unwrap(), 1);
        assert_eq!(Value::from(3).as_float(&interpreter).unwrap(), 3.0);

        assert!(Value::from(1).as_boolean(&interpreter).unwrap());
        assert!(!Value::from(0).as_boolean(&interpreter).unwrap());
        assert!(Value::from("text").as_boolean(&interpreter).unwrap());
        assert!(!Value::from("").as_boolean(&interpreter).unwrap());

        assert_eq!(Value::from("abc").as_string(), "abc");
        assert_eq!(Value::from(7).as_string(), "7");
    }

    #[test]
    fn test_coercion_failure() {
        let interpreter = Interpreter::new();
        let array = Value::from(vec![Value::from(1)]);

        assert!(array.as_integer(&interpreter).is_err());
        assert!(array.as_boolean(&interpreter).is_err());
        assert!(Value::from(5).as_array(&interpreter).is_err());
    }

    #[test]
    fn test_shallow_clone_shares_storage() {
        let original = Value::from(vec![Value::from(1)]);
        let copy = original.clone();

        if let Value::Array(array) = &copy {
            array.borrow_mut().push(Value::from(2));
        }

        if let Value::Array(array) = &original {
            assert_eq!(array.borrow().len(), 2);
        }
    }

    #[test]
    fn test_deep_clone_is_isolated() {
        let original = Value::from(vec![Value::from(1)]);
        let copy = original.deep_clone();

        if let Value::Array(array) = &copy {
            array.borrow_mut().push(Value::from(2));
        }

        if let Value::Array(array) = &original {
            assert_eq!(array.borrow().len(), 1);
        }
    }

    #[test]
    fn test_equality() {
        assert_eq!(Value::from(5), Value::from(5));
        assert_ne!(Value::from(5), Value::from(5.0));
        assert_eq!(Value::from("a"), Value::from("a"));

        // Arrays compare by identity.
        let a = Value::from(vec![Value::from(1)]);
        let b = Value::from(vec![Value::from(1)]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_hash_map_keys() {
        let mut map = ValueHashMap::new();

        map.insert(Value::from("key"), Value::from(1));
        map.insert(Value::from(10), Value::from(2));

        assert_eq!(map.get(&Value::from("key")), Some(&Value::from(1)));
        assert_eq!(map.get(&Value::from(10)), Some(&Value::from(2)));
        assert_eq!(map.get(&Value::from("other")), None);
    }

    #[test]
    fn test_display() {
        let array = Value::from(vec![Value::from(1), Value::from("two")]);

        assert_eq!(array.to_string(), "[ 1 , \"two\" ]");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::stringify("a\nb"), "\"a\\nb\"");
    }
}
