//! Template kind classification by type suffix

use super::registry::ImportMap;

/// Type suffix of declarative (Jinja) templates
pub const DECLARATIVE_SUFFIX: &str = ".jinja";
/// Type suffix of scripted (Lua) templates
pub const SCRIPTED_SUFFIX: &str = ".lua";

/// Which expansion strategy a template type uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Text-substitution template rendered with minijinja
    Declarative,
    /// Lua script exposing `GenerateConfig(context)`
    Scripted,
}

impl TemplateKind {
    /// The strategy a type suffix names, regardless of whether it is imported
    pub fn from_suffix(type_name: &str) -> Option<Self> {
        if type_name.ends_with(DECLARATIVE_SUFFIX) {
            Some(Self::Declarative)
        } else if type_name.ends_with(SCRIPTED_SUFFIX) {
            Some(Self::Scripted)
        } else {
            None
        }
    }

    /// Classify a resource type
    ///
    /// A type is a template only if it has a template suffix and the exact
    /// type string is an imported artifact. Anything else is primitive.
    pub fn classify(type_name: &str, imports: &ImportMap) -> Option<Self> {
        Self::from_suffix(type_name).filter(|_| imports.contains(type_name))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Declarative => "declarative",
            Self::Scripted => "scripted",
        }
    }
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_suffix() {
        assert_eq!(TemplateKind::from_suffix("vm.jinja"), Some(TemplateKind::Declarative));
        assert_eq!(TemplateKind::from_suffix("lib/vm.lua"), Some(TemplateKind::Scripted));
        assert_eq!(TemplateKind::from_suffix("compute.v1.instance"), None);
        assert_eq!(TemplateKind::from_suffix("vm.py"), None);
    }

    #[test]
    fn test_classify_needs_import() {
        let imports = ImportMap::from_iter([("vm.jinja", "resources: []")]);
        assert_eq!(
            TemplateKind::classify("vm.jinja", &imports),
            Some(TemplateKind::Declarative)
        );
        assert_eq!(TemplateKind::classify("other.jinja", &imports), None);
        assert_eq!(TemplateKind::classify("vm.lua", &imports), None);
    }

    #[test]
    fn test_imported_primitive_type_is_not_a_template() {
        let imports = ImportMap::from_iter([("compute.v1.instance", "")]);
        assert_eq!(TemplateKind::classify("compute.v1.instance", &imports), None);
    }
}
