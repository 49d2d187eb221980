use std::collections::HashMap;

use crate::error::{Error, Result};

/// Prefix of every generated designator. It is reserved: hand-picked
/// designators starting with it are rejected.
pub const AUTOGENERATED_PREFIX: &str = "__";

pub const DEFAULT_SEPARATOR: char = ':';

/// A token resolved to the template it instantiates and the designator of
/// the instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Resolved {
    pub template: String,
    pub designator: String,
}

/// Turns `template<sep>designator` tokens into designator bindings.
///
/// Bindings and auto-numbering counters live for one harness build.
#[derive(Debug, Clone)]
pub struct DesignatorResolver {
    separator: char,
    /// designator -> template
    bindings: HashMap<String, String>,
    /// template -> last generated sequence number
    counters: HashMap<String, u32>,
}

impl Default for DesignatorResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

impl DesignatorResolver {
    pub fn new(separator: char) -> Self {
        Self {
            separator,
            bindings: HashMap::new(),
            counters: HashMap::new(),
        }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Resolve a raw connection token.
    ///
    /// * `TEMPLATE<sep>NAME` binds `NAME` to `TEMPLATE`.
    /// * `TEMPLATE<sep>` generates a fresh designator for `TEMPLATE`.
    /// * `NAME` refers to an existing designator, or to a template used as
    ///   its own designator.
    pub fn resolve(&mut self, token: &str) -> Result<Resolved> {
        let Some((template, suffix)) = token.split_once(self.separator) else {
            if let Some(template) = self.bindings.get(token) {
                return Ok(Resolved {
                    template: template.clone(),
                    designator: token.to_owned(),
                });
            }
            Self::check_reserved(token)?;
            self.bindings.insert(token.to_owned(), token.to_owned());
            return Ok(Resolved {
                template: token.to_owned(),
                designator: token.to_owned(),
            });
        };

        if suffix.contains(self.separator) {
            return Err(Error::AmbiguousSeparator {
                token: token.to_owned(),
                separator: self.separator,
            });
        }

        let designator = if suffix.is_empty() {
            self.next_autogenerated(template)
        } else {
            Self::check_reserved(suffix)?;
            suffix.to_owned()
        };
        self.bind(&designator, template)?;

        Ok(Resolved {
            template: template.to_owned(),
            designator,
        })
    }

    /// Template bound to `designator`, if it has been seen in this build.
    pub fn template_of(&self, designator: &str) -> Option<&str> {
        self.bindings.get(designator).map(String::as_str)
    }

    fn bind(&mut self, designator: &str, template: &str) -> Result<()> {
        match self.bindings.get(designator) {
            Some(existing) if existing != template => Err(Error::DesignatorConflict {
                designator: designator.to_owned(),
                existing: existing.clone(),
                requested: template.to_owned(),
            }),
            Some(_) => Ok(()),
            None => {
                self.bindings
                    .insert(designator.to_owned(), template.to_owned());
                Ok(())
            }
        }
    }

    fn check_reserved(designator: &str) -> Result<()> {
        if designator.starts_with(AUTOGENERATED_PREFIX) {
            return Err(Error::ReservedDesignator {
                designator: designator.to_owned(),
                prefix: AUTOGENERATED_PREFIX,
            });
        }
        Ok(())
    }

    fn next_autogenerated(&mut self, template: &str) -> String {
        let counter = self.counters.entry(template.to_owned()).or_insert(0);
        *counter += 1;
        format!("{AUTOGENERATED_PREFIX}{template}_{counter}")
    }
}
