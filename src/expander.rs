//! Macro expansion.
//!
//! [`expand1`] rewrites a form while its head names a macro, to a fixpoint.
//! [`expand`] does that at the top of a form and then descends into every
//! element independently, left to right. The payload of a `quote` form is
//! data and is never visited.
//!
//! Both functions return [`Cow::Borrowed`] when no transformer fired, so
//! evaluating macro-free code does not copy it.

use crate::Error;
use crate::ast::{Macro, Value};
use crate::evaluator::{Environment, MacroTable};
use std::borrow::Cow;
use tracing::trace;

impl Macro {
    /// Run the transformer on a raw form with the acting scopes
    pub fn transform(
        &self,
        form: Value,
        env: &Environment,
        menv: &MacroTable,
    ) -> Result<Value, Error> {
        self.closure().invoke(vec![
            form,
            Value::Environment(env.clone()),
            Value::MacroTable(menv.clone()),
        ])
    }
}

/// The macro named by the head of `form`, if any
fn head_macro(form: &Value, menv: &MacroTable) -> Option<(String, Macro)> {
    let Value::List(elements) = form else {
        return None;
    };
    let name = elements.first()?.as_symbol()?;
    menv.get(name).map(|transformer| (name.to_owned(), transformer))
}

fn is_quote_form(elements: &[Value]) -> bool {
    matches!(elements.first(), Some(Value::String(head)) if head == "quote")
}

/// Shallow expansion: replace `form` by its macro output until the head
/// no longer names a macro. There is no cycle detection.
pub fn expand1<'a>(
    form: &'a Value,
    env: &Environment,
    menv: &MacroTable,
) -> Result<Cow<'a, Value>, Error> {
    let mut current = Cow::Borrowed(form);
    while let Some((name, transformer)) = head_macro(&current, menv) {
        trace!(macro_name = %name, form = %current, "expanding");
        current = Cow::Owned(transformer.transform(current.into_owned(), env, menv)?);
    }
    Ok(current)
}

/// Deep expansion: [`expand1`] on the form, then [`expand`] on each element
/// of the result unless it is a `quote` form.
pub fn expand<'a>(
    form: &'a Value,
    env: &Environment,
    menv: &MacroTable,
) -> Result<Cow<'a, Value>, Error> {
    if menv.is_empty() {
        return Ok(Cow::Borrowed(form));
    }

    let expanded = expand1(form, env, menv)?;
    let Value::List(elements) = expanded.as_ref() else {
        return Ok(expanded);
    };
    if is_quote_form(elements) {
        return Ok(expanded);
    }

    // Copied lazily, from the first element that actually changed
    let mut rewritten: Option<Vec<Value>> = None;
    for (i, element) in elements.iter().enumerate() {
        match expand(element, env, menv)? {
            Cow::Owned(new_element) => rewritten
                .get_or_insert_with(|| elements[..i].to_vec())
                .push(new_element),
            Cow::Borrowed(_) => {
                if let Some(rewritten) = rewritten.as_mut() {
                    rewritten.push(element.clone());
                }
            }
        }
    }

    match rewritten {
        Some(elements) => Ok(Cow::Owned(Value::List(elements))),
        None => Ok(expanded),
    }
}
