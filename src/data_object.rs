// data_object.rs - User defined structured records

use crate::value::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// The shape of a user defined structure: its name, field names, and the
/// default value each field starts with.
#[derive(Debug)]
pub struct DataObjectDefinition {
    pub name: String,
    pub is_hidden: bool,
    pub field_names: Vec<String>,
    pub defaults: Vec<Value>,
}

impl DataObjectDefinition {
    pub fn new(
        name: &str,
        is_hidden: bool,
        field_names: Vec<String>,
        defaults: Vec<Value>,
    ) -> Rc<Self> {
        Rc::new(DataObjectDefinition {
            name: name.to_string(),
            is_hidden,
            field_names,
            defaults,
        })
    }
}

/// One instance of a structure.  Fields start as deep clones of the
/// definition's defaults.
#[derive(Debug, Clone)]
pub struct DataObject {
    pub definition: Rc<DataObjectDefinition>,
    pub fields: Vec<Value>,
}

impl DataObject {
    pub fn new(definition: &Rc<DataObjectDefinition>) -> Self {
        let fields = definition
            .defaults
            .iter()
            .map(|value| value.deep_clone())
            .collect();

        DataObject {
            definition: definition.clone(),
            fields,
        }
    }

    pub fn deep_clone(&self) -> Self {
        DataObject {
            definition: self.definition.clone(),
            fields: self.fields.iter().map(|value| value.deep_clone()).collect(),
        }
    }
}

// Structures are equal when they have the same definition name and equal
// fields.
impl PartialEq for DataObject {
    fn eq(&self, other: &Self) -> bool {
        self.definition.name == other.definition.name && self.fields == other.fields
    }
}

impl Eq for DataObject {}

impl Hash for DataObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.definition.name.hash(state);
        self.fields.hash(state);
    }
}

impl fmt::Display for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "# {}", self.definition.name)?;

        for (i, field) in self.fields.iter().enumerate() {
            let text = if field.is_string() {
                Value::stringify(&field.as_string())
            } else {
                field.to_string()
            };

            write!(f, "    {} -> {}", self.definition.field_names[i], text)?;

            if i < self.fields.len() - 1 {
                writeln!(f, " ,")?;
            } else {
                writeln!(f)?;
            }
        }

        write!(f, ";")
    }
}

// ============================================================================
// TESTS
// ============================================================================
