//! Sealed collection of templates
//!
//! Registration order is significant: it breaks ties between message
//! templates whose headers match equally well.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::template::Template;
use crate::error::{SchemaError, SchemaErrorKind, SchemaResult};

/// Immutable, name-indexed set of templates
#[derive(Clone, Debug, Default)]
pub struct TemplateRegistry {
    templates: Vec<Arc<Template>>,
    index: HashMap<String, usize>,
}

impl TemplateRegistry {
    /// Indexes `templates` and performs the cross-template checks.
    ///
    /// # Errors
    ///
    /// * [`SchemaErrorKind::DuplicateTemplate`] if two templates share a name;
    /// * [`SchemaErrorKind::UnknownType`] if a nested object or a choice
    ///   alternative names a type with no template;
    /// * [`SchemaErrorKind::NotAssignable`] if an alternative does not list
    ///   the choice's base type among its (transitive) supertypes.
    pub fn seal(templates: Vec<Template>) -> SchemaResult<Self> {
        let mut index = HashMap::with_capacity(templates.len());
        for (ix, t) in templates.iter().enumerate() {
            if index.insert(t.name().to_owned(), ix).is_some() {
                return Err(SchemaError::new(
                    t.name(),
                    SchemaErrorKind::DuplicateTemplate(t.name().to_owned()),
                ));
            }
        }
        let reg = Self {
            templates: templates.into_iter().map(Arc::new).collect(),
            index,
        };
        for t in &reg.templates {
            for r in t.type_references() {
                let target = r.concrete.as_ref().unwrap_or(&r.base);
                if !reg.index.contains_key(target) {
                    return Err(SchemaError::new(
                        t.name(),
                        SchemaErrorKind::UnknownType(target.clone()),
                    ));
                }
                if !reg.is_assignable(target, &r.base) {
                    return Err(SchemaError::new(
                        t.name(),
                        SchemaErrorKind::NotAssignable {
                            type_name: target.clone(),
                            base: r.base.clone(),
                        },
                    ));
                }
            }
        }
        Ok(reg)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Template>> {
        self.index.get(name).map(|&ix| &self.templates[ix])
    }

    /// Registration index of the named template
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Templates in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Template>> {
        self.templates.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Whether a record of type `concrete` may appear where `base` is
    /// declared, following supertypes transitively.
    #[must_use]
    pub fn is_assignable(&self, concrete: &str, base: &str) -> bool {
        let mut pending = vec![concrete];
        let mut visited = HashSet::new();
        while let Some(name) = pending.pop() {
            if name == base {
                return true;
            }
            if !visited.insert(name) {
                continue;
            }
            if let Some(t) = self.get(name) {
                pending.extend(t.supertypes().iter().map(String::as_str));
            }
        }
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::conv::convert::ConverterRegistry;
    use crate::int::ByteOrder;
    use crate::schema::binding::{Alternative, Binding, Choices};
    use crate::schema::descriptor::{FieldDescriptor, TemplateDescriptor};
    use crate::schema::types::ValueType;

    fn template(desc: TemplateDescriptor) -> Template {
        Template::build(&desc, &ConverterRegistry::default()).unwrap()
    }

    fn leaf(name: &str) -> TemplateDescriptor {
        TemplateDescriptor::new(name).field(
            FieldDescriptor::new("v", ValueType::U8).bind(Binding::primitive(8, ByteOrder::BigEndian)),
        )
    }

    fn holder(alt: &str) -> TemplateDescriptor {
        TemplateDescriptor::new("Holder").field(
            FieldDescriptor::new("shape", ValueType::object("Shape")).bind(Binding::choice(
                Choices::with_prefix(8).alternative(Alternative::new("#prefix == 1", 1, alt)),
            )),
        )
    }

    #[test]
    fn transitive_supertypes() {
        let reg = TemplateRegistry::seal(vec![
            template(leaf("Polygon").extends("Shape")),
            template(leaf("Square").extends("Polygon")),
            template(holder("Square")),
        ])
        .unwrap();
        assert!(reg.is_assignable("Square", "Shape"));
        assert!(!reg.is_assignable("Polygon", "Square"));
        assert_eq!(reg.position("Holder"), Some(2));
    }

    #[test]
    fn cross_template_errors() {
        let err = TemplateRegistry::seal(vec![template(leaf("A")), template(leaf("A"))]).unwrap_err();
        assert_eq!(err.kind, SchemaErrorKind::DuplicateTemplate("A".into()));

        let err = TemplateRegistry::seal(vec![template(holder("Circle"))]).unwrap_err();
        assert_eq!(err.kind, SchemaErrorKind::UnknownType("Circle".into()));

        let err = TemplateRegistry::seal(vec![template(leaf("Circle")), template(holder("Circle"))])
            .unwrap_err();
        assert_eq!(
            err.kind,
            SchemaErrorKind::NotAssignable {
                type_name: "Circle".into(),
                base: "Shape".into()
            }
        );
    }

    #[test]
    fn supertype_cycles_terminate() {
        let reg = TemplateRegistry::seal(vec![
            template(leaf("A").extends("B")),
            template(leaf("B").extends("A")),
        ])
        .unwrap();
        assert!(reg.is_assignable("A", "B"));
        assert!(!reg.is_assignable("A", "C"));
    }
}
