use std::fmt;

/// Which handler served a request.
///
/// Resolved once when a route is registered, from the handler's type path.
/// Plain functions carry their own name; anonymous handlers (closures,
/// generic handler types) fall back to the name of their type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteIdentity {
    Named { module: String, name: String },
    Typed { module: String, type_name: String },
}

impl RouteIdentity {
    pub fn of<H>(_handler: &H) -> Self {
        Self::from_type_path(std::any::type_name::<H>())
    }

    /// Splits a Rust type path such as `app::views::index` into its
    /// module and final segment.
    pub fn from_type_path(path: &str) -> Self {
        // Generic arguments may contain `::` themselves; drop them first.
        let base = match path.find('<') {
            Some(i) => &path[..i],
            None => path,
        };
        let generic = base.len() != path.len();

        // `{{closure}}` segments belong to the enclosing item.
        let mut segments: Vec<&str> = base.split("::").collect();
        let mut closure = false;
        while segments.len() > 1 && segments.last() == Some(&"{{closure}}") {
            segments.pop();
            closure = true;
        }

        if closure {
            return Self::Typed {
                module: segments.join("."),
                type_name: "closure".into(),
            };
        }

        let last = segments.pop().unwrap_or_default();
        let module = segments.join(".");

        if generic || !is_identifier(last) {
            return Self::Typed {
                module,
                type_name: last.to_owned(),
            };
        }

        Self::Named {
            module,
            name: last.to_owned(),
        }
    }

    pub fn module(&self) -> &str {
        match self {
            Self::Named { module, .. } | Self::Typed { module, .. } => module,
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
}

impl fmt::Display for RouteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { module, name } => write!(f, "{module}.{name}"),
            Self::Typed { module, type_name } => write!(f, "{module}.{type_name}"),
        }
    }
}
