// interpreter.rs - The interpreter facade owning all runtime state

use crate::bytecode::resolve_jumps;
use crate::codegen::generate_handler;
use crate::constructor::Constructor;
use crate::contextual::{ContextualList, Dictionary, Word};
use crate::error::{Result, ScriptError};
use crate::lexer::{tokenize, Token};
use crate::location::{Location, SourceBuffer};
use crate::value::Value;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Every word implementation, native or generated, has this shape.
pub type WordHandler = Rc<dyn Fn(&mut Interpreter) -> Result<()>>;

/// A handler table entry.  The table index is the word's stable identity.
#[derive(Clone)]
pub struct WordHandlerInfo {
    pub name: String,
    pub handler: WordHandler,
    pub location: Location,
}

/// Flags passed when registering a word.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordFlags {
    pub is_immediate: bool,
    pub is_hidden: bool,
    pub is_scripted: bool,
}

impl WordFlags {
    pub fn immediate() -> Self {
        WordFlags {
            is_immediate: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
struct CallItem {
    name: String,
    location: Location,
}

/// The interpreter: data stack, dictionary, handler and variable tables,
/// call stack, and the constructor stack for source being compiled.
pub struct Interpreter {
    search_paths: Vec<PathBuf>,

    dictionary: Dictionary,
    pub handlers: ContextualList<WordHandlerInfo>,
    pub variables: ContextualList<Value>,

    stack: Vec<Value>,
    max_depth: usize,

    call_stack: Vec<CallItem>,
    constructors: Vec<Constructor>,

    pub current_location: Option<Location>,

    unique_counter: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter {
            search_paths: Vec::new(),
            dictionary: Dictionary::new(),
            handlers: ContextualList::new(),
            variables: ContextualList::new(),
            stack: Vec::with_capacity(50),
            max_depth: 0,
            call_stack: Vec::with_capacity(100),
            constructors: Vec::new(),
            current_location: None,
            unique_counter: 0,
        }
    }

    /// Clone this interpreter's state for an isolated child context.  All
    /// scope layers flatten into the child's root, and the child gets a
    /// fresh layer of its own on top.
    pub fn child(&self) -> Interpreter {
        let mut child = Interpreter {
            search_paths: self.search_paths.clone(),
            dictionary: self.dictionary.clone_flattened(),
            handlers: self.handlers.clone_flattened(),
            variables: self.variables.clone_flattened(),
            stack: Vec::with_capacity(50),
            max_depth: 0,
            call_stack: Vec::with_capacity(100),
            constructors: Vec::new(),
            current_location: None,
            unique_counter: 0,
        };

        child.mark_context();
        child
    }

    // ------------------------------------------------------------------------
    // Data stack
    // ------------------------------------------------------------------------

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);

        if self.stack.len() > self.max_depth {
            self.max_depth = self.stack.len();
        }
    }

    pub fn pop(&mut self) -> Result<Value> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => Err(self.script_error("Stack underflow.")),
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Iterate the stack from the top down.
    pub fn stack_iter(&self) -> impl Iterator<Item = &Value> {
        self.stack.iter().rev()
    }

    pub fn clear_stack(&mut self) {
        self.stack.clear();
    }

    /// Remove and return the value at the given depth, 0 being the top.
    pub fn pick(&mut self, index: usize) -> Result<Value> {
        if index >= self.stack.len() {
            return Err(self.script_error(format!("Pick depth {} is out of range.", index)));
        }

        let position = self.stack.len() - 1 - index;
        Ok(self.stack.remove(position))
    }

    /// Pop the top value and reinsert it at the given depth.
    pub fn push_to(&mut self, index: usize) -> Result<()> {
        let value = self.pop()?;

        if index > self.stack.len() {
            return Err(self.script_error(format!("Push depth {} is out of range.", index)));
        }

        let position = self.stack.len() - index;
        self.stack.insert(position, value);

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------------

    /// Build a script error carrying the current location and a call stack
    /// trace folded into the message.
    pub fn script_error(&self, message: impl Into<String>) -> ScriptError {
        let mut message = message.into();

        if !self.call_stack.is_empty() {
            message.push_str("\n\nCall stack:\n");

            for item in self.call_stack.iter().rev() {
                message.push_str(&format!("  {} -- {}\n", item.location, item.name));
            }
        }

        match &self.current_location {
            Some(location) => ScriptError::with_location(location.clone(), message),
            None => ScriptError::new(message),
        }
    }

    // ------------------------------------------------------------------------
    // Word registration and lookup
    // ------------------------------------------------------------------------

    pub fn add_word_with_flags(
        &mut self,
        name: &str,
        handler: WordHandler,
        location: Location,
        description: &str,
        signature: &str,
        flags: WordFlags,
    ) {
        let info = WordHandlerInfo {
            name: name.to_string(),
            handler,
            location: location.clone(),
        };
        let index = self.handlers.insert(info);

        let word = Word {
            is_immediate: flags.is_immediate,
            is_scripted: flags.is_scripted,
            is_hidden: flags.is_hidden,
            description: description.to_string(),
            signature: signature.to_string(),
            handler_index: index,
            location: Some(location),
        };

        self.dictionary.insert(name, word);
    }

    /// Register an ordinary native word, capturing the Rust caller's
    /// location for error traces.
    #[track_caller]
    pub fn add_word<F>(&mut self, name: &str, handler: F, description: &str, signature: &str)
    where
        F: Fn(&mut Interpreter) -> Result<()> + 'static,
    {
        let location = Location::from_caller(std::panic::Location::caller());

        self.add_word_with_flags(
            name,
            Rc::new(handler),
            location,
            description,
            signature,
            WordFlags::default(),
        );
    }

    /// Register a native word that executes at compile time.
    #[track_caller]
    pub fn add_immediate_word<F>(
        &mut self,
        name: &str,
        handler: F,
        description: &str,
        signature: &str,
    ) where
        F: Fn(&mut Interpreter) -> Result<()> + 'static,
    {
        let location = Location::from_caller(std::panic::Location::caller());

        self.add_word_with_flags(
            name,
            Rc::new(handler),
            location,
            description,
            signature,
            WordFlags::immediate(),
        );
    }

    pub fn find_word(&self, name: &str) -> Option<Word> {
        self.dictionary.find(name)
    }

    /// Look a word up through its handler index.
    pub fn find_word_by_index(&self, index: usize) -> Option<(Word, String)> {
        let name = self.handlers.get(index).ok()?.name.clone();
        let word = self.dictionary.find(&name)?;

        Some((word, name))
    }

    pub fn words(&self) -> BTreeMap<String, Word> {
        self.dictionary.combined_words()
    }

    // ------------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------------

    pub fn execute_word_index(&mut self, index: usize) -> Result<()> {
        let info = match self.handlers.get(index) {
            Ok(info) => info.clone(),
            Err(_) => return Err(self.script_error(format!("Handler index {} not found.", index))),
        };

        if self.current_location.is_none() {
            self.current_location = Some(info.location.clone());
        }

        self.call_stack.push(CallItem {
            name: info.name.clone(),
            location: info.location.clone(),
        });

        let result = (info.handler)(self);

        // Unwind bookkeeping on success and failure alike.
        self.call_stack.pop();
        self.current_location = None;

        result
    }

    pub fn execute_word_named(&mut self, name: &str) -> Result<()> {
        match self.find_word(name) {
            Some(word) => self.execute_word_index(word.handler_index),
            None => Err(self.script_error(format!("Word, {}, not found.", name))),
        }
    }

    pub fn execute_word(&mut self, word: &Word) -> Result<()> {
        self.execute_word_index(word.handler_index)
    }

    pub fn execute_word_at(&mut self, location: Location, word: &Word) -> Result<()> {
        self.current_location = Some(location);
        self.execute_word_index(word.handler_index)
    }

    // ------------------------------------------------------------------------
    // Contexts
    // ------------------------------------------------------------------------

    pub fn mark_context(&mut self) {
        self.dictionary.mark_context();
        self.handlers.mark_context();
        self.variables.mark_context();
    }

    pub fn release_context(&mut self) -> Result<()> {
        self.dictionary.release_context()?;
        self.handlers.release_context()?;
        self.variables.release_context()?;

        Ok(())
    }

    /// Drop the current user context and start a fresh one, clearing the
    /// data stack.
    pub fn reset(&mut self) -> Result<()> {
        self.release_context()?;
        self.stack.clear();
        self.mark_context();

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------------

    pub fn constructor(&self) -> Result<&Constructor> {
        match self.constructors.last() {
            Some(constructor) => Ok(constructor),
            None => Err(self.script_error("No code constructor available.")),
        }
    }

    pub fn constructor_mut(&mut self) -> Result<&mut Constructor> {
        if self.constructors.is_empty() {
            return Err(self.script_error("No code constructor available."));
        }

        Ok(self.constructors.last_mut().unwrap())
    }

    /// Begin compiling a new token stream.  Balanced by pop_constructor on
    /// every exit path.
    pub fn push_constructor(&mut self, tokens: Vec<Token>) {
        self.constructors.push(Constructor::new(tokens));
    }

    pub fn pop_constructor(&mut self) {
        self.constructors.pop();
    }

    // ------------------------------------------------------------------------
    // Source processing
    // ------------------------------------------------------------------------

    pub fn add_search_path(&mut self, path: &str) {
        let mut path = PathBuf::from(path);

        if !path.is_absolute() {
            if let Ok(current) = env::current_dir() {
                path = current.join(path);
            }
        }

        if path.is_dir() {
            self.search_paths.push(path);
        }
    }

    /// Resolve a script path against the search paths, most recently added
    /// first.
    pub fn find_file(&self, path: &str) -> Result<PathBuf> {
        let direct = Path::new(path);

        if direct.is_absolute() && direct.exists() {
            return Ok(direct.to_path_buf());
        }

        for search_path in self.search_paths.iter().rev() {
            let full_path = search_path.join(path);

            if full_path.is_file() {
                return Ok(full_path);
            }
        }

        Err(self.script_error(format!("File, {}, not found.", path)))
    }

    pub fn process_source_file(&mut self, path: &str) -> Result<()> {
        let full_path = self.find_file(path)?;

        log::debug!("processing source file {}", full_path.display());

        let buffer = SourceBuffer::from_file(&full_path)
            .map_err(|error| self.script_error(format!("Failed to read {}: {}", path, error)))?;

        let name = full_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string());

        self.process_buffer(&name, buffer)
    }

    pub fn process_source(&mut self, name: &str, source: &str) -> Result<()> {
        let buffer = SourceBuffer::from_string(name, source);
        self.process_buffer(name, buffer)
    }

    /// Tokenize, compile, and run one piece of source.  The constructor
    /// stack is unwound on every exit path so that nested calls (include,
    /// code.execute_source) compose.
    fn process_buffer(&mut self, name: &str, mut buffer: SourceBuffer) -> Result<()> {
        let tokens = tokenize(&mut buffer)?;

        self.push_constructor(tokens);

        let result = self.compile_and_run(name);

        self.pop_constructor();
        result
    }

    fn compile_and_run(&mut self, name: &str) -> Result<()> {
        self.compile_token_list()?;

        let mut code = {
            let constructor = self.constructor_mut()?;
            std::mem::take(&mut constructor.top_mut()?.byte_code)
        };

        resolve_jumps(&mut code)?;

        let handler = generate_handler(self, name, code, false)?;
        handler(self)
    }

    // ------------------------------------------------------------------------
    // Unique names
    // ------------------------------------------------------------------------

    /// Produce a process-unique identifier, used for generated labels.  The
    /// counter lives here rather than in a global so separate interpreters
    /// stay independent.
    pub fn unique_string(&mut self) -> String {
        let new_string = format!("unique-{:04}", self.unique_counter);
        self.unique_counter += 1;

        new_string
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
