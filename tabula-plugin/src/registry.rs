//! Plugin Registry

use crate::{EvalContext, FunctionMeta, FunctionPlugin};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tabula_core::{codes, TabulaError, Value};

/// Central plugin registry
pub struct PluginRegistry {
    functions: HashMap<String, Arc<dyn FunctionPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn with_function<F: FunctionPlugin + 'static>(mut self, f: F) -> Self {
        let name = f.meta().name.to_lowercase();
        self.functions.insert(name, Arc::new(f));
        self
    }

    pub fn get_function(&self, name: &str) -> Option<&dyn FunctionPlugin> {
        self.functions.get(&name.to_lowercase()).map(|f| f.as_ref())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered function names, sorted
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn call_function(&self, name: &str, args: &[Value], ctx: &EvalContext) -> Value {
        match self.get_function(name) {
            Some(f) => {
                let result = f.call(args, ctx);
                match &result {
                    Value::Error(e) => tracing::debug!(function = name, code = %e.code, "call failed"),
                    _ => tracing::debug!(function = name, args = args.len(), "call ok"),
                }
                result
            }
            None => {
                let similar = self.find_similar_functions(name);
                let mut err = TabulaError::undefined_func(name);
                if !similar.is_empty() {
                    let suggestions: Vec<&str> = similar.iter().take(5).map(|s| s.as_str()).collect();
                    err = err.with_suggestion(format!(
                        "Similar: {}. Use help() for full list.",
                        suggestions.join(", ")
                    ));
                }
                tracing::debug!(function = name, "unknown function");
                Value::Error(err)
            }
        }
    }

    /// Find function names similar to the given name (for error suggestions)
    fn find_similar_functions(&self, name: &str) -> Vec<String> {
        let name_lower = name.to_lowercase();
        let mut matches: Vec<(String, usize)> = self
            .functions
            .keys()
            .filter_map(|func_name| {
                let score = Self::similarity_score(&name_lower, func_name);
                if score > 0 {
                    Some((func_name.clone(), score))
                } else {
                    None
                }
            })
            .collect();

        matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        matches.into_iter().map(|(name, _)| name).collect()
    }

    /// Prefix and substring matches dominate, shared characters break ties
    fn similarity_score(query: &str, candidate: &str) -> usize {
        let mut score = 0;

        if candidate.starts_with(query) {
            score += 100;
        } else if candidate.contains(query) {
            score += 50;
        } else if query.contains(candidate) {
            score += 30;
        }

        // Family prefix (binom_, norm_, ...) is a strong hint
        let query_family = query.split('_').next().unwrap_or(query);
        let candidate_family = candidate.split('_').next().unwrap_or(candidate);
        if !query_family.is_empty() && query_family == candidate_family {
            score += 40;
        }

        let query_chars: HashSet<char> = query.chars().collect();
        let candidate_chars: HashSet<char> = candidate.chars().collect();
        let common = query_chars.intersection(&candidate_chars).count();
        if common * 2 < query_chars.len() {
            return score;
        }
        score += common * 2;

        let len_diff = (query.len() as i32 - candidate.len() as i32).unsigned_abs() as usize;
        if len_diff < 5 && score > 0 {
            score += 5 - len_diff;
        }

        score
    }

    pub fn help(&self, name: Option<&str>) -> Value {
        match name {
            Some(n) => self.help_for(n),
            None => self.general_help(),
        }
    }

    fn help_for(&self, name: &str) -> Value {
        match self.functions.get(&name.to_lowercase()) {
            Some(f) => Value::Object(function_to_help(f.meta())),
            None => Value::Error(TabulaError::new(
                codes::NOT_FOUND,
                format!("No function named '{}'", name),
            )),
        }
    }

    fn general_help(&self) -> Value {
        let mut funcs_by_cat: HashMap<String, Vec<String>> = HashMap::new();
        for (name, f) in &self.functions {
            let cat = f.meta().category.to_string();
            funcs_by_cat.entry(cat).or_default().push(name.clone());
        }

        let mut help = HashMap::new();
        help.insert(
            "functions".to_string(),
            Value::Object(
                funcs_by_cat
                    .into_iter()
                    .map(|(k, mut v)| {
                        v.sort();
                        (k, Value::List(v.into_iter().map(Value::Text).collect()))
                    })
                    .collect(),
            ),
        );
        help.insert(
            "usage".to_string(),
            Value::Text("Call help('function_name') for detailed help.".to_string()),
        );
        Value::Object(help)
    }

    pub fn list_functions(&self, category: Option<&str>) -> Value {
        let mut metas: Vec<FunctionMeta> = self
            .functions
            .values()
            .map(|f| f.meta())
            .filter(|m| category.map_or(true, |c| m.category == c || m.category.starts_with(&format!("{}/", c))))
            .collect();
        metas.sort_by_key(|m| m.name);

        Value::List(
            metas
                .into_iter()
                .map(|meta| {
                    let mut obj = HashMap::new();
                    obj.insert("name".to_string(), Value::from(meta.name));
                    obj.insert("description".to_string(), Value::from(meta.description));
                    obj.insert("usage".to_string(), Value::from(meta.usage));
                    obj.insert("category".to_string(), Value::from(meta.category));
                    Value::Object(obj)
                })
                .collect(),
        )
    }
}

fn function_to_help(meta: FunctionMeta) -> HashMap<String, Value> {
    let mut help = HashMap::new();
    help.insert("name".to_string(), Value::from(meta.name));
    help.insert("type".to_string(), Value::from("function"));
    help.insert("description".to_string(), Value::from(meta.description));
    help.insert("usage".to_string(), Value::from(meta.usage));
    help.insert("returns".to_string(), Value::from(meta.returns));
    help.insert("category".to_string(), Value::from(meta.category));
    help.insert(
        "args".to_string(),
        Value::List(
            meta.args
                .iter()
                .map(|a| {
                    let mut arg = HashMap::new();
                    arg.insert("name".to_string(), Value::from(a.name));
                    arg.insert("type".to_string(), Value::from(a.typ));
                    arg.insert("description".to_string(), Value::from(a.description));
                    arg.insert("optional".to_string(), Value::Bool(a.optional));
                    if let Some(d) = a.default {
                        arg.insert("default".to_string(), Value::from(d));
                    }
                    Value::Object(arg)
                })
                .collect(),
        ),
    );
    help.insert(
        "examples".to_string(),
        Value::List(meta.examples.iter().map(|e| Value::from(*e)).collect()),
    );
    help.insert(
        "related".to_string(),
        Value::List(meta.related.iter().map(|r| Value::from(*r)).collect()),
    );
    help
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
