//! Variable environment: global table, function-call scope stack,
//! user-function registry, and the special-variable cache.
//!
//! AWK scoping is flat: a name is either a parameter of an active
//! function call or a global. Lookup walks the frame stack innermost
//! first and falls back to the global table. Scalar/array typing is
//! sticky per slot; using a scalar as an array (or vice versa) is
//! diagnosed at the operation site.
//!
//! Array arguments alias (see [`AliasSlot`]): when a bare,
//! still-uninitialized name is passed to a function, the callee's
//! parameter remembers the caller's slot. If the callee first uses the
//! parameter as an array, the array vivifies in the caller's binding
//! and both slots share it - the "implicitly created as array"
//! contract of argument passing.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use fawk_par::Function;

use crate::value::{new_array, ArrayRef, TypeError, Value};

/// Where a deferred array argument should vivify.
#[derive(Debug, Clone)]
pub enum AliasSlot {
    Global(String),
    Frame(usize, String),
}

/// One function-call scope frame.
#[derive(Default)]
struct Frame {
    locals: FxHashMap<String, Value>,
    aliases: FxHashMap<String, AliasSlot>,
}

/// The variable environment.
pub struct Environment {
    globals: FxHashMap<String, Value>,
    frames: Vec<Frame>,
    functions: FxHashMap<String, Rc<Function>>,
}

/// Resolved location of a name.
enum Slot {
    Frame(usize),
    Global,
    Unbound,
}

impl Environment {
    /// Creates an environment with the special-variable defaults in
    /// place.
    pub fn new() -> Self {
        let mut globals = FxHashMap::default();
        let defaults: &[(&str, Value)] = &[
            ("FS", Value::Str(" ".into())),
            ("RS", Value::Str("\n".into())),
            ("OFS", Value::Str(" ".into())),
            ("ORS", Value::Str("\n".into())),
            ("NR", Value::Num(0.0)),
            ("NF", Value::Num(0.0)),
            ("FNR", Value::Num(0.0)),
            ("FILENAME", Value::Str(String::new())),
            ("SUBSEP", Value::Str("\u{1C}".into())),
            ("CONVFMT", Value::Str("%.6g".into())),
            ("OFMT", Value::Str("%.6g".into())),
            ("RSTART", Value::Num(0.0)),
            ("RLENGTH", Value::Num(0.0)),
            ("IGNORECASE", Value::Num(0.0)),
            ("RT", Value::Str(String::new())),
            ("FPAT", Value::Str(String::new())),
            ("TEXTDOMAIN", Value::Str("messages".into())),
        ];
        for (name, value) in defaults {
            globals.insert((*name).to_string(), value.clone());
        }
        Self {
            globals,
            frames: Vec::new(),
            functions: FxHashMap::default(),
        }
    }

    // ------------------------------------------------------------------
    // Function registry
    // ------------------------------------------------------------------

    /// Registers a user function definition.
    pub fn define_function(&mut self, function: Function) {
        self.functions
            .insert(function.name.clone(), Rc::new(function));
    }

    /// Looks up a user function by (qualified) name.
    pub fn function(&self, name: &str) -> Option<Rc<Function>> {
        self.functions.get(name).cloned()
    }

    /// Names of all user functions, for `FUNCTAB`.
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    /// Pushes a call frame with the given parameter bindings and
    /// deferred array aliases.
    pub fn push_frame(
        &mut self,
        locals: FxHashMap<String, Value>,
        aliases: FxHashMap<String, AliasSlot>,
    ) {
        self.frames.push(Frame { locals, aliases });
    }

    /// Pops the innermost call frame.
    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Resolves where `name` currently lives, innermost frame first.
    fn find(&self, name: &str) -> Slot {
        for (i, frame) in self.frames.iter().enumerate().rev() {
            if frame.locals.contains_key(name) {
                return Slot::Frame(i);
            }
        }
        if self.globals.contains_key(name) {
            Slot::Global
        } else {
            Slot::Unbound
        }
    }

    /// Describes `name`'s slot as an alias target for a callee.
    pub fn slot_for_alias(&self, name: &str) -> AliasSlot {
        match self.find(name) {
            Slot::Frame(i) => AliasSlot::Frame(i, name.to_string()),
            _ => AliasSlot::Global(name.to_string()),
        }
    }

    // ------------------------------------------------------------------
    // Scalar access
    // ------------------------------------------------------------------

    /// Reads a variable; unset names read as uninitialized.
    pub fn get(&self, name: &str) -> Value {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.locals.get(name) {
                return value.clone();
            }
        }
        self.globals.get(name).cloned().unwrap_or(Value::Uninit)
    }

    /// Writes a scalar. The slot is the innermost frame binding the
    /// name, else the global table. Fails if the slot holds an array.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), TypeError> {
        match self.find(name) {
            Slot::Frame(i) => {
                let slot = self.frames[i].locals.get_mut(name).expect("bound local");
                if slot.is_array() && !value.is_array() {
                    return Err(TypeError::ArrayAsScalar(name.to_string()));
                }
                *slot = value;
                Ok(())
            }
            Slot::Global | Slot::Unbound => self.set_global(name, value),
        }
    }

    /// Writes a global directly (driver `-v` assignments, `SYMTAB`).
    pub fn set_global(&mut self, name: &str, value: Value) -> Result<(), TypeError> {
        if let Some(slot) = self.globals.get_mut(name) {
            if slot.is_array() && !value.is_array() {
                return Err(TypeError::ArrayAsScalar(name.to_string()));
            }
            *slot = value;
        } else {
            self.globals.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Reads a global directly.
    pub fn get_global(&self, name: &str) -> Value {
        self.globals.get(name).cloned().unwrap_or(Value::Uninit)
    }

    /// Global variable names, for `SYMTAB` iteration.
    pub fn global_names(&self) -> Vec<String> {
        self.globals.keys().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Array access
    // ------------------------------------------------------------------

    /// Returns the array bound to `name`, vivifying an uninitialized
    /// slot into a fresh array. A deferred alias vivifies in the
    /// caller's slot so both bindings share the container. Fails when
    /// the slot holds a scalar.
    pub fn get_array(&mut self, name: &str) -> Result<ArrayRef, TypeError> {
        match self.find(name) {
            Slot::Frame(i) => {
                match self.frames[i].locals.get(name) {
                    Some(Value::Array(array)) => return Ok(array.clone()),
                    Some(Value::Uninit) | None => {}
                    Some(_) => {
                        return Err(TypeError::ScalarAsArray(name.to_string()));
                    }
                }
                let array = match self.frames[i].aliases.get(name).cloned() {
                    Some(target) => self.vivify_target(target)?,
                    None => new_array(),
                };
                self.frames[i]
                    .locals
                    .insert(name.to_string(), Value::Array(array.clone()));
                Ok(array)
            }
            Slot::Global | Slot::Unbound => self.vivify_target(AliasSlot::Global(name.to_string())),
        }
    }

    /// Vivifies (or fetches) the array at an alias target, following
    /// chained aliases through outer frames. Every intermediate
    /// parameter slot on the chain ends up sharing the container.
    fn vivify_target(&mut self, target: AliasSlot) -> Result<ArrayRef, TypeError> {
        let mut current = target;
        let mut trail: Vec<AliasSlot> = Vec::new();
        loop {
            match current {
                AliasSlot::Global(name) => {
                    let array = match self.globals.get(&name) {
                        Some(Value::Array(array)) => array.clone(),
                        Some(Value::Uninit) | None => {
                            let array = new_array();
                            self.globals
                                .insert(name.clone(), Value::Array(array.clone()));
                            array
                        }
                        Some(_) => {
                            return Err(TypeError::ScalarAsArray(name));
                        }
                    };
                    self.store_trail(&trail, &array);
                    return Ok(array);
                }
                AliasSlot::Frame(i, name) => {
                    match self.frames[i].locals.get(&name) {
                        Some(Value::Array(array)) => {
                            let array = array.clone();
                            self.store_trail(&trail, &array);
                            return Ok(array);
                        }
                        Some(Value::Uninit) | None => {
                            if let Some(next) = self.frames[i].aliases.get(&name).cloned() {
                                trail.push(AliasSlot::Frame(i, name));
                                current = next;
                                continue;
                            }
                            let array = new_array();
                            self.frames[i]
                                .locals
                                .insert(name.clone(), Value::Array(array.clone()));
                            self.store_trail(&trail, &array);
                            return Ok(array);
                        }
                        Some(_) => {
                            return Err(TypeError::ScalarAsArray(name));
                        }
                    }
                }
            }
        }
    }

    /// Stores the vivified array into every intermediate alias slot.
    fn store_trail(&mut self, trail: &[AliasSlot], array: &ArrayRef) {
        for slot in trail {
            match slot {
                AliasSlot::Global(name) => {
                    self.globals
                        .insert(name.clone(), Value::Array(array.clone()));
                }
                AliasSlot::Frame(i, name) => {
                    self.frames[*i]
                        .locals
                        .insert(name.clone(), Value::Array(array.clone()));
                }
            }
        }
    }

    /// True if `name` currently holds an array.
    pub fn is_array(&self, name: &str) -> bool {
        self.get(name).is_array()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Cached copies of the special variables the record machinery reads
/// on every record. Refreshed when marked dirty (an assignment to one
/// of these names) and at record boundaries.
#[derive(Debug, Clone)]
pub struct Specials {
    pub fs: String,
    pub rs: String,
    pub ofs: String,
    pub ors: String,
    pub subsep: String,
    pub convfmt: String,
    pub ofmt: String,
    pub fpat: String,
    pub textdomain: String,
    pub ignore_case: bool,
}

impl Specials {
    pub fn from_env(env: &Environment) -> Self {
        let mut specials = Self {
            fs: String::new(),
            rs: String::new(),
            ofs: String::new(),
            ors: String::new(),
            subsep: String::new(),
            convfmt: String::new(),
            ofmt: String::new(),
            fpat: String::new(),
            textdomain: String::new(),
            ignore_case: false,
        };
        specials.refresh(env);
        specials
    }

    /// Re-reads every cached special from the environment.
    pub fn refresh(&mut self, env: &Environment) {
        let convfmt = env.get_global("CONVFMT").to_str("%.6g");
        self.fs = env.get_global("FS").to_str(&convfmt);
        self.rs = env.get_global("RS").to_str(&convfmt);
        self.ofs = env.get_global("OFS").to_str(&convfmt);
        self.ors = env.get_global("ORS").to_str(&convfmt);
        self.subsep = env.get_global("SUBSEP").to_str(&convfmt);
        self.ofmt = env.get_global("OFMT").to_str(&convfmt);
        self.fpat = env.get_global("FPAT").to_str(&convfmt);
        self.textdomain = env.get_global("TEXTDOMAIN").to_str(&convfmt);
        self.ignore_case = env.get_global("IGNORECASE").to_bool();
        self.convfmt = convfmt;
    }
}

/// True for the names the [`Specials`] cache mirrors.
pub fn is_cached_special(name: &str) -> bool {
    matches!(
        name,
        "FS" | "RS"
            | "OFS"
            | "ORS"
            | "SUBSEP"
            | "CONVFMT"
            | "OFMT"
            | "FPAT"
            | "TEXTDOMAIN"
            | "IGNORECASE"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let env = Environment::new();
        assert_eq!(env.get("FS").to_str("%.6g"), " ");
        assert_eq!(env.get("RS").to_str("%.6g"), "\n");
        assert_eq!(env.get("SUBSEP").to_str("%.6g"), "\u{1C}");
        assert_eq!(env.get("NR").to_number(), 0.0);
        assert!(matches!(env.get("nosuch"), Value::Uninit));
    }

    #[test]
    fn test_global_set_get() {
        let mut env = Environment::new();
        env.set("x", Value::Num(5.0)).unwrap();
        assert_eq!(env.get("x").to_number(), 5.0);
    }

    #[test]
    fn test_frame_shadows_global() {
        let mut env = Environment::new();
        env.set("x", Value::Num(1.0)).unwrap();

        let mut locals = FxHashMap::default();
        locals.insert("x".to_string(), Value::Num(2.0));
        env.push_frame(locals, FxHashMap::default());

        assert_eq!(env.get("x").to_number(), 2.0);
        env.set("x", Value::Num(3.0)).unwrap();
        assert_eq!(env.get("x").to_number(), 3.0);

        env.pop_frame();
        // The global is untouched.
        assert_eq!(env.get("x").to_number(), 1.0);
    }

    #[test]
    fn test_unbound_set_goes_global() {
        let mut env = Environment::new();
        env.push_frame(FxHashMap::default(), FxHashMap::default());
        env.set("g", Value::Num(9.0)).unwrap();
        env.pop_frame();
        assert_eq!(env.get("g").to_number(), 9.0);
    }

    #[test]
    fn test_array_vivification() {
        let mut env = Environment::new();
        let array = env.get_array("a").unwrap();
        array.borrow_mut().insert("k".into(), Value::Num(1.0));
        // The same container comes back.
        let again = env.get_array("a").unwrap();
        assert_eq!(again.borrow().get("k").unwrap().to_number(), 1.0);
    }

    #[test]
    fn test_scalar_as_array_is_error() {
        let mut env = Environment::new();
        env.set("x", Value::Num(1.0)).unwrap();
        assert!(env.get_array("x").is_err());
    }

    #[test]
    fn test_array_assignment_is_error() {
        let mut env = Environment::new();
        env.get_array("a").unwrap();
        assert!(env.set("a", Value::Num(1.0)).is_err());
    }

    #[test]
    fn test_deferred_alias_vivifies_in_caller() {
        let mut env = Environment::new();

        // Caller passes uninitialized global `data` as parameter `arr`.
        let mut locals = FxHashMap::default();
        locals.insert("arr".to_string(), Value::Uninit);
        let mut aliases = FxHashMap::default();
        aliases.insert("arr".to_string(), AliasSlot::Global("data".to_string()));
        env.push_frame(locals, aliases);

        // Callee uses the parameter as an array.
        let array = env.get_array("arr").unwrap();
        array.borrow_mut().insert("1".into(), Value::Num(10.0));
        env.pop_frame();

        // The caller's `data` now aliases the same contents.
        let data = env.get_array("data").unwrap();
        assert_eq!(data.borrow().get("1").unwrap().to_number(), 10.0);
    }

    #[test]
    fn test_chained_alias_through_two_calls() {
        let mut env = Environment::new();

        // f(outer) -> frame 0 param `a` aliases global `outer`.
        let mut locals = FxHashMap::default();
        locals.insert("a".to_string(), Value::Uninit);
        let mut aliases = FxHashMap::default();
        aliases.insert("a".to_string(), AliasSlot::Global("outer".to_string()));
        env.push_frame(locals, aliases);

        // g(a) -> frame 1 param `b` aliases frame 0's `a`.
        let mut locals = FxHashMap::default();
        locals.insert("b".to_string(), Value::Uninit);
        let mut aliases = FxHashMap::default();
        aliases.insert("b".to_string(), AliasSlot::Frame(0, "a".to_string()));
        env.push_frame(locals, aliases);

        let array = env.get_array("b").unwrap();
        array.borrow_mut().insert("k".into(), Value::Num(7.0));

        env.pop_frame();
        env.pop_frame();

        let outer = env.get_array("outer").unwrap();
        assert_eq!(outer.borrow().get("k").unwrap().to_number(), 7.0);
    }

    #[test]
    fn test_specials_refresh() {
        let mut env = Environment::new();
        let mut specials = Specials::from_env(&env);
        assert_eq!(specials.fs, " ");
        assert!(!specials.ignore_case);

        env.set("FS", Value::Str(",".into())).unwrap();
        env.set("IGNORECASE", Value::Num(1.0)).unwrap();
        specials.refresh(&env);
        assert_eq!(specials.fs, ",");
        assert!(specials.ignore_case);
    }
}
