use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One of the five API access rules of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleKind {
    List,
    View,
    Create,
    Update,
    Delete,
}

impl RuleKind {
    /// All rules in their canonical order.
    pub const ALL: [RuleKind; 5] = [
        RuleKind::List,
        RuleKind::View,
        RuleKind::Create,
        RuleKind::Update,
        RuleKind::Delete,
    ];

    /// JSON property name, e.g. `listRule`.
    pub fn property(&self) -> &'static str {
        match self {
            RuleKind::List => "listRule",
            RuleKind::View => "viewRule",
            RuleKind::Create => "createRule",
            RuleKind::Update => "updateRule",
            RuleKind::Delete => "deleteRule",
        }
    }

    /// Exported Go struct field name, e.g. `ListRule`.
    pub fn go_property(&self) -> &'static str {
        match self {
            RuleKind::List => "ListRule",
            RuleKind::View => "ViewRule",
            RuleKind::Create => "CreateRule",
            RuleKind::Update => "UpdateRule",
            RuleKind::Delete => "DeleteRule",
        }
    }

    pub(crate) fn ordinal(&self) -> usize {
        *self as usize
    }
}

impl Display for RuleKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.property())
    }
}

/// API access rules of a collection.
///
/// `None` locks the action to superusers, `Some("")` makes it public and any
/// other string is a filter expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rules {
    #[serde(default)]
    pub list_rule: Option<String>,
    #[serde(default)]
    pub view_rule: Option<String>,
    #[serde(default)]
    pub create_rule: Option<String>,
    #[serde(default)]
    pub update_rule: Option<String>,
    #[serde(default)]
    pub delete_rule: Option<String>,
}

impl Rules {
    pub fn get(&self, kind: RuleKind) -> Option<&String> {
        match kind {
            RuleKind::List => self.list_rule.as_ref(),
            RuleKind::View => self.view_rule.as_ref(),
            RuleKind::Create => self.create_rule.as_ref(),
            RuleKind::Update => self.update_rule.as_ref(),
            RuleKind::Delete => self.delete_rule.as_ref(),
        }
    }

    pub fn set(&mut self, kind: RuleKind, rule: Option<String>) {
        let slot = match kind {
            RuleKind::List => &mut self.list_rule,
            RuleKind::View => &mut self.view_rule,
            RuleKind::Create => &mut self.create_rule,
            RuleKind::Update => &mut self.update_rule,
            RuleKind::Delete => &mut self.delete_rule,
        };
        *slot = rule;
    }
}
