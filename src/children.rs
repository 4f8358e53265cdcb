//! Validity predicate and flattening for raw children lists
use crate::types::Child;

/// A child is dropped from any children list iff it is null, `false` or the empty string.
/// Zero and `true` are valid here; `true` only disappears once normalized.
pub fn is_valid_child(child: &Child) -> bool {
    match child {
        Child::Null | Child::Bool(false) => false,
        Child::Text(text) => !text.is_empty(),
        _ => true,
    }
}

/// Collapse arbitrarily nested lists into one level, left to right.
pub fn flatten_children(children: Vec<Child>) -> Vec<Child> {
    let mut result = Vec::with_capacity(children.len());
    let mut stack: Vec<Child> = children.into_iter().rev().collect();

    while let Some(child) = stack.pop() {
        match child {
            Child::List(items) => stack.extend(items.into_iter().rev()),
            other => result.push(other),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity() {
        assert!(!is_valid_child(&Child::Null));
        assert!(!is_valid_child(&Child::Bool(false)));
        assert!(!is_valid_child(&Child::Text(String::new())));
        assert!(is_valid_child(&Child::Bool(true)));
        assert!(is_valid_child(&Child::Number(0.0)));
        assert!(is_valid_child(&Child::Text("0".into())));
        assert!(is_valid_child(&Child::List(vec![])));
    }

    #[test]
    fn flattens_deeply_nested_lists_in_order() {
        let nested = crate::children![
            "a",
            vec![Child::from("b"), Child::List(vec![Child::from("c"), Child::List(vec![])])],
            "d",
        ];
        assert_eq!(flatten_children(nested), crate::children!["a", "b", "c", "d"]);
    }

    #[test]
    fn flatten_keeps_invalid_entries_for_the_filter() {
        let flat = flatten_children(vec![Child::List(vec![Child::Null, Child::Bool(false)])]);
        assert_eq!(flat, vec![Child::Null, Child::Bool(false)]);
    }
}
