//! Selectable options and option groups
//!
//! An option is a `{ value, label }` pair. Two options are the same option
//! when their values match; the label is display text only.

use serde::{Deserialize, Serialize};

/// Label used for the group of host template variables appended to choices
pub const TEMPLATE_VARIABLES_LABEL: &str = "Template Variables";

/// A single selectable option
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Option whose label is its value (the common case for ARM names)
    pub fn from_value(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

impl PartialEq for SelectOption {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

/// A labelled group of options rendered after the fetched ones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionGroup {
    pub label: String,
    pub options: Vec<SelectOption>,
}

impl OptionGroup {
    /// Group of template variables (`$sub`, `$rg`, ...) offered on every field
    pub fn template_variables(variables: &[String]) -> Self {
        Self {
            label: TEMPLATE_VARIABLES_LABEL.to_string(),
            options: variables.iter().map(SelectOption::from_value).collect(),
        }
    }
}

/// Everything a picker would offer for one field
#[derive(Debug, Clone, PartialEq)]
pub struct Choices {
    pub options: Vec<SelectOption>,
    pub groups: Vec<OptionGroup>,
}

impl Choices {
    /// Find an option by value across fetched options and groups
    pub fn find(&self, value: &str) -> Option<&SelectOption> {
        find_option(&self.options, value).or_else(|| {
            self.groups
                .iter()
                .find_map(|group| find_option(&group.options, value))
        })
    }

    pub fn len(&self) -> usize {
        self.options.len() + self.groups.iter().map(|g| g.options.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Find the option carrying `value`, if any
pub fn find_option<'a>(options: &'a [SelectOption], value: &str) -> Option<&'a SelectOption> {
    options.iter().find(|option| option.value == value)
}
