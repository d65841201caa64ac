use std::collections::HashMap;

/// Lexical scopes, innermost last. The bottom scope belongs to the function
/// body and is never popped.
#[derive(Debug, Clone)]
pub struct ScopeStack<T> {
    scopes: Vec<HashMap<String, T>>,
}

impl<T> Default for ScopeStack<T> {
    fn default() -> Self { Self::new() }
}

impl<T> ScopeStack<T> {
    pub fn new() -> Self { Self { scopes: vec![HashMap::new()] } }

    pub fn enter(&mut self) { self.scopes.push(HashMap::new()); }

    pub fn exit(&mut self) {
        if self.scopes.len() > 1 { self.scopes.pop(); }
    }

    pub fn depth(&self) -> usize { self.scopes.len() }

    /// Declares `name` in the innermost scope. A name already declared in that
    /// same scope is left untouched and the rejected value is handed back.
    pub fn declare(&mut self, name: &str, value: T) -> Result<(), T> {
        let scope = match self.scopes.last_mut() {
            Some(scope) => scope,
            None => return Err(value),
        };
        if scope.contains_key(name) { return Err(value); }
        scope.insert(name.to_string(), value);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn declared_here(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|scope| scope.contains_key(name))
    }
}
