use std::borrow::Cow;

use super::value::Value;

/// Outcome of resolving a dotted path such as `Loan.Borrower.Name`.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Value),
    /// Qualified correctly but a segment is missing or an intermediate is null.
    Missing,
    /// First segment names neither the root nor an active loop variable.
    Unqualified,
}

impl Resolution {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Resolution::Found(value) => Some(value),
            Resolution::Missing | Resolution::Unqualified => None,
        }
    }
}

#[derive(Debug, Clone)]
struct LoopFrame {
    name: String,
    item: Value,
}

/// Names visible to placeholders and conditions: the root model plus any
/// enclosing loop variables, innermost first.
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    root_name: &'a str,
    root: &'a Value,
    frames: Vec<LoopFrame>,
}

impl<'a> Scope<'a> {
    pub fn new(root_name: &'a str, root: &'a Value) -> Self {
        Self {
            root_name,
            root,
            frames: Vec::new(),
        }
    }

    /// Scope for one loop iteration binding `name` to `item`.
    pub fn with_item(&self, name: &str, item: Value) -> Self {
        let mut frames = self.frames.clone();
        frames.push(LoopFrame {
            name: name.to_string(),
            item,
        });
        Self {
            root_name: self.root_name,
            root: self.root,
            frames,
        }
    }

    pub fn root_name(&self) -> &str {
        self.root_name
    }

    /// Every name that may start a path, innermost loop variable first.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .frames
            .iter()
            .rev()
            .map(|frame| frame.name.as_str())
            .collect();
        names.push(self.root_name);
        names
    }

    /// Value bound to a scope name.
    pub fn binding(&self, name: &str) -> Option<&Value> {
        if let Some(frame) = self.frames.iter().rev().find(|frame| frame.name == name) {
            return Some(&frame.item);
        }
        (name == self.root_name).then_some(self.root)
    }

    pub fn resolve(&self, path: &str) -> Resolution {
        let mut segments = path.split('.').map(str::trim);
        let Some(head) = segments.next() else {
            return Resolution::Unqualified;
        };
        let Some(start) = self.binding(head) else {
            return Resolution::Unqualified;
        };

        let mut current = Cow::Borrowed(start);
        for segment in segments {
            let next = match current {
                Cow::Borrowed(value) => value.member(segment),
                Cow::Owned(ref value) => value
                    .member(segment)
                    .map(|member| Cow::Owned(member.into_owned())),
            };
            match next {
                Some(next) => current = next,
                None => return Resolution::Missing,
            }
        }
        Resolution::Found(current.into_owned())
    }

    /// Items of a list-valued path; anything else yields no items.
    pub fn resolve_items(&self, path: &str) -> Vec<Value> {
        match self.resolve(path) {
            Resolution::Found(Value::List(items)) => items,
            _ => Vec::new(),
        }
    }
}
