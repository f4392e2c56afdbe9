//! Host environment: the registry of capabilities the language calls into
//!
//! A host entry is either a callable or a namespace of further entries.
//! Names are case-insensitive. The evaluator only sees these traits, so a
//! terminal, canvas, or network layer can be plugged in without touching
//! the core.

use super::value::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::{BufRead, Write};
use std::rc::Rc;

/// Result of a host call; the error string becomes a `HOST_ERROR`.
pub type HostResult = Result<Value, String>;

/// A callable provided by the host
pub trait HostFunction {
    fn name(&self) -> &str;
    fn invoke(&self, args: &[Value]) -> HostResult;
}

/// A named group of host entries (`MATH`, `STR`, ...)
pub trait HostNamespace {
    fn name(&self) -> &str;
    fn get_member(&self, name: &str) -> Option<HostEntry>;
    /// Member names, for spelling suggestions
    fn member_names(&self) -> Vec<String>;
}

#[derive(Clone)]
pub enum HostEntry {
    Function(Rc<dyn HostFunction>),
    Namespace(Rc<dyn HostNamespace>),
}

impl HostEntry {
    pub fn into_value(self) -> Value {
        match self {
            HostEntry::Function(f) => Value::HostFunction(f),
            HostEntry::Namespace(ns) => Value::Namespace(ns),
        }
    }
}

/// Native function type
pub type NativeFn = fn(&[Value]) -> HostResult;

/// A host function backed by a plain Rust function
pub struct NativeFunction {
    name: String,
    func: NativeFn,
}

impl NativeFunction {
    pub fn new(name: impl Into<String>, func: NativeFn) -> Self {
        NativeFunction {
            name: name.into(),
            func,
        }
    }
}

impl HostFunction for NativeFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, args: &[Value]) -> HostResult {
        (self.func)(args)
    }
}

/// A namespace holding a fixed set of entries
pub struct NativeNamespace {
    name: String,
    members: BTreeMap<String, HostEntry>,
}

impl NativeNamespace {
    pub fn new(name: impl Into<String>) -> Self {
        NativeNamespace {
            name: name.into(),
            members: BTreeMap::new(),
        }
    }

    pub fn with_function(mut self, name: &str, func: NativeFn) -> Self {
        let qualified = format!("{}.{name}", self.name);
        self.members.insert(
            name.to_ascii_uppercase(),
            HostEntry::Function(Rc::new(NativeFunction::new(qualified, func))),
        );
        self
    }

    pub fn with_entry(mut self, name: &str, entry: HostEntry) -> Self {
        self.members.insert(name.to_ascii_uppercase(), entry);
        self
    }
}

impl HostNamespace for NativeNamespace {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_member(&self, name: &str) -> Option<HostEntry> {
        self.members.get(&name.to_ascii_uppercase()).cloned()
    }

    fn member_names(&self) -> Vec<String> {
        self.members.keys().cloned().collect()
    }
}

/// Line source for `INPUT`
pub trait InputSource {
    /// Next line without its terminator, or `None` when exhausted.
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

/// No input available; every `INPUT` fails
pub struct NoInput;

impl InputSource for NoInput {
    fn read_line(&mut self, _prompt: &str) -> Option<String> {
        None
    }
}

/// Pre-supplied lines, for tests and embedding
#[derive(Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedInput {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn read_line(&mut self, _prompt: &str) -> Option<String> {
        self.lines.pop_front()
    }
}

/// Interactive input from stdin; the prompt goes to stdout
pub struct StdinInput;

impl InputSource for StdinInput {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{prompt}");
        let _ = stdout.flush();
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Name → entry registry consulted for identifiers that are not variables
pub struct HostEnvironment {
    entries: HashMap<String, HostEntry>,
    input: Box<dyn InputSource>,
}

impl HostEnvironment {
    /// An empty registry with no input
    pub fn new() -> Self {
        HostEnvironment {
            entries: HashMap::new(),
            input: Box::new(NoInput),
        }
    }

    /// The built-in functions and namespaces
    pub fn with_stdlib() -> Self {
        let mut host = Self::new();
        super::stdlib::install(&mut host);
        host
    }

    pub fn register(&mut self, name: &str, entry: HostEntry) {
        self.entries.insert(name.to_ascii_uppercase(), entry);
    }

    pub fn register_function(&mut self, name: &str, func: NativeFn) {
        self.register(name, HostEntry::Function(Rc::new(NativeFunction::new(name, func))));
    }

    pub fn register_namespace(&mut self, namespace: impl HostNamespace + 'static) {
        let name = namespace.name().to_string();
        self.register(&name, HostEntry::Namespace(Rc::new(namespace)));
    }

    pub fn get(&self, name: &str) -> Option<HostEntry> {
        self.entries.get(&name.to_ascii_uppercase()).cloned()
    }

    pub fn namespace(&self, name: &str) -> Option<Rc<dyn HostNamespace>> {
        match self.get(name) {
            Some(HostEntry::Namespace(ns)) => Some(ns),
            _ => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn set_input(&mut self, input: impl InputSource + 'static) {
        self.input = Box::new(input);
    }

    pub fn read_line(&mut self, prompt: &str) -> Option<String> {
        self.input.read_line(prompt)
    }
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self::new()
    }
}
