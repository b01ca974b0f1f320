// contextual.rs - Scope-layered containers for words, handlers, and variables

use crate::error::{Result, ScriptError};
use crate::location::Location;
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// CONTEXTUAL LIST
// ============================================================================

#[derive(Debug, Clone)]
struct Layer<T> {
    items: Vec<T>,
    start_index: usize,
}

/// An indexed container layered into scopes.  Global indices stay valid
/// across scope boundaries because each layer records the total item count
/// at the time it was created; lookups scan from the innermost layer out.
#[derive(Debug, Clone)]
pub struct ContextualList<T> {
    stack: Vec<Layer<T>>,
}

impl<T: Clone> ContextualList<T> {
    pub fn new() -> Self {
        ContextualList {
            stack: vec![Layer {
                items: Vec::new(),
                start_index: 0,
            }],
        }
    }

    pub fn len(&self) -> usize {
        let top = &self.stack[self.stack.len() - 1];
        top.start_index + top.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append to the innermost layer, returning the item's global index.
    pub fn insert(&mut self, value: T) -> usize {
        let top = self.stack.last_mut().unwrap();
        top.items.push(value);

        self.len() - 1
    }

    pub fn get(&self, index: usize) -> Result<&T> {
        if index < self.len() {
            for layer in self.stack.iter().rev() {
                if index >= layer.start_index {
                    return Ok(&layer.items[index - layer.start_index]);
                }
            }
        }

        Err(ScriptError::new(format!("Index {} not found.", index)))
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        if index < self.len() {
            for layer in self.stack.iter_mut().rev() {
                if index >= layer.start_index {
                    layer.items[index - layer.start_index] = value;
                    return Ok(());
                }
            }
        }

        Err(ScriptError::new(format!("Index {} not found.", index)))
    }

    pub fn mark_context(&mut self) {
        let start_index = self.len();

        self.stack.push(Layer {
            items: Vec::new(),
            start_index,
        });
    }

    /// Drop the innermost layer.  The root layer can never be released.
    pub fn release_context(&mut self) -> Result<()> {
        if self.stack.len() <= 1 {
            return Err(ScriptError::new("No context to release."));
        }

        self.stack.pop();
        Ok(())
    }

    /// Copy every layer's items into a single fresh root layer.  Used when
    /// cloning interpreter state for an isolated child context.
    pub fn clone_flattened(&self) -> Self {
        let mut items = Vec::with_capacity(self.len());

        for layer in &self.stack {
            items.extend(layer.items.iter().cloned());
        }

        ContextualList {
            stack: vec![Layer {
                items,
                start_index: 0,
            }],
        }
    }
}

impl<T: Clone> Default for ContextualList<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// DICTIONARY
// ============================================================================

/// A dictionary entry.  The handler index is the word's stable identity in
/// the handler table, independent of its name.
#[derive(Debug, Clone)]
pub struct Word {
    pub is_immediate: bool,
    pub is_scripted: bool,
    pub is_hidden: bool,
    pub description: String,
    pub signature: String,
    pub handler_index: usize,
    pub location: Option<Location>,
}

/// The word dictionary: a stack of name maps with innermost-wins lookup.
/// This shadowing is the only scoping mechanism for words.
#[derive(Debug, Clone)]
pub struct Dictionary {
    stack: Vec<HashMap<String, Word>>,
}

impl Dictionary {
    pub fn new() -> Self {
        Dictionary {
            stack: vec![HashMap::new()],
        }
    }

    pub fn insert(&mut self, name: &str, word: Word) {
        self.stack
            .last_mut()
            .unwrap()
            .insert(name.to_string(), word);
    }

    pub fn find(&self, name: &str) -> Option<Word> {
        for layer in self.stack.iter().rev() {
            if let Some(word) = layer.get(name) {
                return Some(word.clone());
            }
        }

        None
    }

    /// All visible words, sorted by name, inner definitions shadowing outer
    /// ones.
    pub fn combined_words(&self) -> BTreeMap<String, Word> {
        let mut words = BTreeMap::new();

        for layer in self.stack.iter().rev() {
            for (name, word) in layer {
                words.entry(name.clone()).or_insert_with(|| word.clone());
            }
        }

        words
    }

    pub fn mark_context(&mut self) {
        self.stack.push(HashMap::new());
    }

    pub fn release_context(&mut self) -> Result<()> {
        if self.stack.len() <= 1 {
            return Err(ScriptError::new("No context to release."));
        }

        self.stack.pop();
        Ok(())
    }

    /// Merge every layer into a single root layer for a child context.  The
    /// child starts with one flat global scope.
    pub fn clone_flattened(&self) -> Self {
        let mut root = HashMap::new();

        for layer in &self.stack {
            for (name, word) in layer {
                root.insert(name.clone(), word.clone());
            }
        }

        Dictionary { stack: vec![root] }
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn word(index: usize) -> Word {
        Word {
            is_immediate: false,
            is_scripted: false,
            is_hidden: false,
            description: String::new(),
            signature: String::new(),
            handler_index: index,
            location: None,
        }
    }

    #[test]
    fn test_indices_stay_stable_across_layers() {
        let mut list = ContextualList::new();

        let a = list.insert(10);
        list.mark_context();
        let b = list.insert(20);

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(*list.get(0).unwrap(), 10);
        assert_eq!(*list.get(1).unwrap(), 20);
        assert_eq!(list.len(), 2);

        list.release_context().unwrap();

        assert_eq!(list.len(), 1);
        assert!(list.get(1).is_err());
        assert_eq!(*list.get(0).unwrap(), 10);
    }

    #[test]
    fn test_set_reaches_outer_layers() {
        let mut list = ContextualList::new();

        list.insert(1);
        list.mark_context();
        list.set(0, 99).unwrap();

        assert_eq!(*list.get(0).unwrap(), 99);
    }

    #[test]
    fn test_release_past_root_fails() {
        let mut list: ContextualList<i64> = ContextualList::new();

        list.mark_context();
        assert!(list.release_context().is_ok());
        assert!(list.release_context().is_err());

        let mut dictionary = Dictionary::new();
        assert!(dictionary.release_context().is_err());
    }

    #[test]
    fn test_flattened_clone_preserves_indices() {
        let mut list = ContextualList::new();

        list.insert("a");
        list.mark_context();
        list.insert("b");

        let flat = list.clone_flattened();

        assert_eq!(flat.len(), 2);
        assert_eq!(*flat.get(1).unwrap(), "b");

        // A flattened clone has only its root layer.
        let mut flat = flat;
        assert!(flat.release_context().is_err());
    }

    #[test]
    fn test_dictionary_shadowing() {
        let mut dictionary = Dictionary::new();

        dictionary.insert("x", word(1));
        dictionary.mark_context();
        dictionary.insert("x", word(2));

        assert_eq!(dictionary.find("x").unwrap().handler_index, 2);

        dictionary.release_context().unwrap();
        assert_eq!(dictionary.find("x").unwrap().handler_index, 1);
        assert!(dictionary.find("y").is_none());
    }

    #[test]
    fn test_combined_words_prefers_inner() {
        let mut dictionary = Dictionary::new();

        dictionary.insert("x", word(1));
        dictionary.insert("y", word(3));
        dictionary.mark_context();
        dictionary.insert("x", word(2));

        let combined = dictionary.combined_words();

        assert_eq!(combined["x"].handler_index, 2);
        assert_eq!(combined["y"].handler_index, 3);
    }

    #[test]
    fn test_dictionary_flattened_clone() {
        let mut dictionary = Dictionary::new();

        dictionary.insert("x", word(1));
        dictionary.mark_context();
        dictionary.insert("y", word(2));

        let mut flat = dictionary.clone_flattened();

        assert_eq!(flat.find("x").unwrap().handler_index, 1);
        assert_eq!(flat.find("y").unwrap().handler_index, 2);
        assert!(flat.release_context().is_err());
    }
}
