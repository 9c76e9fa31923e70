//! A single declared request argument.

use std::fmt;

use serde_json::Value;

use super::error::ParseError;
use super::inputs::ArgType;
use crate::request::Request;

/// Where in the request an argument may be found.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Location {
    Query,
    /// Urlencoded or `multipart/form-data` text fields. File parts are not
    /// form values.
    Form,
    Json,
    Headers,
}

impl Location {
    fn friendly(self) -> &'static str {
        match self {
            Self::Query => "the query string",
            Self::Form => "the post body",
            Self::Json => "the JSON body",
            Self::Headers => "the HTTP headers",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.friendly())
    }
}

/// Search order for arguments that do not name their locations.
pub const DEFAULT_LOCATIONS: [Location; 3] = [Location::Query, Location::Form, Location::Json];

/// What to keep when a location holds several values for one argument.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Action {
    /// The first value.
    #[default]
    Store,
    /// Every value, as a list.
    Append,
}

/// Declares one expected request input.
///
/// ```rust
/// use tsu_restful::reqparse::{ArgType, Argument, Location};
///
/// let page = Argument::new("page")
///     .location(Location::Query)
///     .kind(ArgType::Positive)
///     .default(1)
///     .help("Page must be a positive number: {error_msg}");
/// assert_eq!(page.dest(), "page");
/// ```
#[derive(Clone, Debug)]
pub struct Argument {
    pub(crate) name: String,
    locations: Vec<Location>,
    kind: ArgType,
    required: bool,
    default: Option<Value>,
    dest: Option<String>,
    choices: Vec<Value>,
    case_sensitive: bool,
    trim: Option<bool>,
    nullable: bool,
    help: Option<String>,
    action: Action,
    ignore: bool,
    store_missing: bool,
}

impl Argument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locations: Vec::new(),
            kind: ArgType::default(),
            required: false,
            default: None,
            dest: None,
            choices: Vec::new(),
            case_sensitive: false,
            trim: None,
            nullable: true,
            help: None,
            action: Action::Store,
            ignore: false,
            store_missing: true,
        }
    }

    /// Adds a location to search. Locations are searched in the order added.
    pub fn location(mut self, location: Location) -> Self {
        if !self.locations.contains(&location) {
            self.locations.push(location);
        }
        self
    }

    pub fn kind(mut self, kind: ArgType) -> Self {
        self.kind = kind;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Stored when the argument is absent. Not coerced.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Key the value is stored under in the [`Namespace`](super::Namespace).
    pub fn dest(&self) -> &str {
        self.dest.as_deref().unwrap_or(&self.name)
    }

    pub fn store_as(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Match the argument name exactly instead of ignoring ASCII case.
    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    /// Overrides the parser-wide trimming setting.
    pub fn trim(mut self, yes: bool) -> Self {
        self.trim = Some(yes);
        self
    }

    pub fn nullable(mut self, yes: bool) -> Self {
        self.nullable = yes;
        self
    }

    /// Message reported on failure; `{error_msg}` is replaced with the reason.
    pub fn help(mut self, template: impl Into<String>) -> Self {
        self.help = Some(template.into());
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Treat values that fail coercion as if they were absent.
    pub fn ignore(mut self, yes: bool) -> Self {
        self.ignore = yes;
        self
    }

    /// When false, an absent optional argument is left out of the result
    /// instead of being stored as its default.
    pub fn store_missing(mut self, yes: bool) -> Self {
        self.store_missing = yes;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn effective_locations(&self) -> &[Location] {
        if self.locations.is_empty() {
            &DEFAULT_LOCATIONS
        } else {
            &self.locations
        }
    }

    pub(crate) fn matches(&self, key: &str) -> bool {
        if self.case_sensitive {
            key == self.name
        } else {
            key.eq_ignore_ascii_case(&self.name)
        }
    }

    fn message(&self, error_msg: &str) -> String {
        match &self.help {
            Some(template) => template.replace("{error_msg}", error_msg),
            None => error_msg.to_owned(),
        }
    }

    /// Extracts, validates and converts this argument.
    ///
    /// `Ok(None)` means nothing is stored for it.
    pub(crate) fn parse(&self, req: &Request, trim_default: bool) -> Result<Option<Value>, ParseError> {
        let mut raw_values = None;
        for location in self.effective_locations() {
            let found = self.values_in(req, *location)?;
            if !found.is_empty() {
                raw_values = Some(found);
                break;
            }
        }
        let Some(raw_values) = raw_values else {
            return self.absent();
        };

        let trim = self.trim.unwrap_or(trim_default);
        let mut values = Vec::with_capacity(raw_values.len());
        for raw in raw_values {
            if raw.is_null() {
                if !self.nullable {
                    return Err(ParseError::NullNotAllowed {
                        name: self.name.clone(),
                        message: self.message("Must not be null!"),
                    });
                }
                values.push(Value::Null);
                continue;
            }

            let raw = match raw {
                Value::String(s) if trim => Value::String(s.trim().to_owned()),
                other => other,
            };

            let value = match self.kind.coerce(&raw) {
                Ok(value) => value,
                Err(_) if self.ignore => continue,
                Err(reason) => {
                    return Err(ParseError::InvalidType {
                        name: self.name.clone(),
                        expected: self.kind.name().to_owned(),
                        message: self.message(&reason),
                        value: raw,
                    });
                }
            };

            if !self.choices.is_empty() && !self.choices.contains(&value) {
                let reason = match &value {
                    Value::String(s) => format!("{s} is not a valid choice"),
                    other => format!("{other} is not a valid choice"),
                };
                return Err(ParseError::InvalidChoice {
                    name: self.name.clone(),
                    choices: self.choices.clone(),
                    message: self.message(&reason),
                    value,
                });
            }
            values.push(value);
        }

        if values.is_empty() {
            return self.absent();
        }
        Ok(Some(match self.action {
            Action::Store => values.swap_remove(0),
            Action::Append => Value::Array(values),
        }))
    }

    fn absent(&self) -> Result<Option<Value>, ParseError> {
        if self.required {
            let places = self.effective_locations().iter()
                .map(|l| l.friendly())
                .collect::<Vec<_>>()
                .join(" or ");
            return Err(ParseError::MissingArgument {
                name: self.name.clone(),
                message: self.message(&format!("Missing required parameter in {places}")),
            });
        }
        if !self.store_missing {
            return Ok(None);
        }
        Ok(Some(self.default.clone().unwrap_or(Value::Null)))
    }

    fn values_in(&self, req: &Request, location: Location) -> Result<Vec<Value>, ParseError> {
        let from_pairs = |pairs: &[(String, String)], any_case: bool| {
            pairs.iter()
                .filter(|(k, _)| if any_case { k.eq_ignore_ascii_case(&self.name) } else { self.matches(k) })
                .map(|(_, v)| Value::String(v.clone()))
                .collect::<Vec<_>>()
        };
        let values = match location {
            Location::Query => from_pairs(req.query(), false),
            Location::Form => from_pairs(req.form(), false),
            // Header names are case-insensitive on the wire.
            Location::Headers => from_pairs(req.headers(), true),
            Location::Json => {
                let body = req.json().map_err(|reason| ParseError::MalformedBody {
                    name: self.name.clone(),
                    message: format!("Failed to decode JSON object: {reason}"),
                })?;
                let Some(Value::Object(map)) = body else {
                    return Ok(Vec::new());
                };
                let hit = map.iter().find(|(k, _)| self.matches(k)).map(|(_, v)| v);
                match (hit, self.action) {
                    (Some(Value::Array(items)), Action::Append) => items.clone(),
                    (Some(value), _) => vec![value.clone()],
                    (None, _) => Vec::new(),
                }
            }
        };
        Ok(values)
    }
}
