//! Field name resolution: declared names and tag annotations to external names.

use indexmap::IndexMap;

use crate::{Field, Shape, StructType};

/// Tag keys consulted by [`Context::with_default_tags`](crate::Context::with_default_tags).
pub const DEFAULT_TAGS: &[&str] = &["field", "schema", "sql", "json", "xml", "yaml"];

/// The external name of a field and whether empty values are omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldName {
    /// Name used for map keys and source lookups.
    pub name: &'static str,
    /// Set by a `,omitempty` option.
    pub omit_empty: bool,
}

/// Resolve one field against ordered tag candidates.
///
/// The first candidate whose tag value is non-empty wins. Its first
/// comma-separated part is the name (an empty part keeps the declared name)
/// and an `omitempty` option sets [`FieldName::omit_empty`]. A tag value of
/// `-` excludes the field and yields `None`. Without a matching tag the
/// declared name is used.
pub fn resolve_field_name<S: AsRef<str>>(field: &Field, tags: &[S]) -> Option<FieldName> {
    let Some(raw) = tags
        .iter()
        .find_map(|key| field.tag_value(key.as_ref()).filter(|v| !v.is_empty()))
    else {
        return Some(FieldName {
            name: field.name(),
            omit_empty: false,
        });
    };

    if raw == "-" {
        return None;
    }

    let mut parts = raw.split(',');
    let name = parts.next().unwrap_or_default();
    let omit_empty = parts.any(|option| option.trim() == "omitempty");
    Some(FieldName {
        name: if name.is_empty() { field.name() } else { name },
        omit_empty,
    })
}

/// A field reachable from a struct type, embedded fields flattened.
#[derive(Debug, Clone)]
pub struct ResolvedField {
    /// External name.
    pub name: &'static str,
    /// Declared name.
    pub declared: &'static str,
    /// Whether empty values are left out of maps.
    pub omit_empty: bool,
    /// The field's shape.
    pub shape: Shape,
    /// Index path from the outer record through embedded records.
    pub path: Vec<usize>,
}

impl ResolvedField {
    /// Names to try when looking the field up in a source: external, then declared.
    pub fn candidates(&self) -> impl Iterator<Item = &'static str> + use<> {
        let declared = (self.declared != self.name).then_some(self.declared);
        core::iter::once(self.name).chain(declared)
    }
}

/// Every exported, non-excluded field of `ty`, in declaration order.
///
/// Embedded struct fields are replaced by the fields of the embedded type.
pub fn resolve_fields<S: AsRef<str>>(ty: &StructType, tags: &[S]) -> Vec<ResolvedField> {
    let mut out = Vec::with_capacity(ty.fields().len());
    collect(ty, tags, &mut Vec::new(), &mut out);
    out
}

fn collect<S: AsRef<str>>(
    ty: &StructType,
    tags: &[S],
    prefix: &mut Vec<usize>,
    out: &mut Vec<ResolvedField>,
) {
    for (index, field) in ty.fields().iter().enumerate() {
        prefix.push(index);
        let shape = field.shape();
        if let (true, Shape::Struct(inner)) = (field.is_embedded(), &shape) {
            collect(inner, tags, prefix, out);
        } else if field.is_exported()
            && let Some(resolved) = resolve_field_name(field, tags)
        {
            out.push(ResolvedField {
                name: resolved.name,
                declared: field.name(),
                omit_empty: resolved.omit_empty,
                shape,
                path: prefix.clone(),
            });
        }
        prefix.pop();
    }
}

/// External names of the fields of `ty`, embedded fields flattened.
pub fn struct_field_names<S: AsRef<str>>(ty: &StructType, tags: &[S]) -> Vec<&'static str> {
    resolve_fields(ty, tags)
        .into_iter()
        .map(|field| field.name)
        .collect()
}

/// Declared name to tag value for every field carrying `tag`, embedded
/// records flattened.
///
/// A trailing `,omitempty` is trimmed; fields whose tag is then empty or `-`
/// are left out.
pub fn struct_field_tags(ty: &StructType, tag: &str) -> IndexMap<&'static str, &'static str> {
    let mut out = IndexMap::new();
    collect_tags(ty, tag, &mut out);
    out
}

fn collect_tags(ty: &StructType, tag: &str, out: &mut IndexMap<&'static str, &'static str>) {
    for field in ty.fields() {
        if field.is_embedded()
            && let Shape::Struct(inner) = field.shape()
        {
            collect_tags(&inner, tag, out);
            continue;
        }
        let Some(raw) = field.tag_value(tag) else {
            continue;
        };
        let value = raw.strip_suffix(",omitempty").unwrap_or(raw);
        if !value.is_empty() && value != "-" {
            out.insert(field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use super::*;
    use crate::ScalarKind;

    fn string() -> Shape {
        Shape::Scalar(ScalarKind::String)
    }

    fn base() -> Shape {
        Shape::Struct(
            StructType::builder("Base")
                .field(Field::new("ID", string).tag("json", "id"))
                .build(),
        )
    }

    fn user() -> Arc<StructType> {
        StructType::builder("User")
            .field(Field::new("Base", base).embedded())
            .field(Field::new("Name", string).tag("json", "name,omitempty"))
            .field(Field::new("Email", string).tag("json", ",omitempty"))
            .field(Field::new("Password", string).tag("json", "-"))
            .field(Field::new("Nick", string).tag("yaml", "nick").tag("json", "nickname"))
            .field(Field::new("secret", string).private())
            .build()
    }

    #[test]
    fn tags_pick_name_and_omitempty() {
        let ty = user();
        let (_, name) = ty.field("Name").unwrap();
        assert_eq!(
            resolve_field_name(name, &["json"]),
            Some(FieldName { name: "name", omit_empty: true })
        );
        let (_, email) = ty.field("Email").unwrap();
        assert_eq!(
            resolve_field_name(email, &["json"]),
            Some(FieldName { name: "Email", omit_empty: true })
        );
    }

    #[test]
    fn dash_excludes() {
        let ty = user();
        let (_, password) = ty.field("Password").unwrap();
        assert_eq!(resolve_field_name(password, &["json"]), None);
        assert!(resolve_field_name(password, &["yaml"]).is_some());
    }

    #[test]
    fn candidates_are_tried_in_order() {
        let ty = user();
        let (_, nick) = ty.field("Nick").unwrap();
        assert_eq!(resolve_field_name(nick, &["yaml", "json"]).unwrap().name, "nick");
        assert_eq!(resolve_field_name(nick, &["json", "yaml"]).unwrap().name, "nickname");
        assert_eq!(resolve_field_name(nick, &["xml"]).unwrap().name, "Nick");
        let none: &[&str] = &[];
        assert_eq!(resolve_field_name(nick, none).unwrap().name, "Nick");
    }

    #[test]
    fn embedded_fields_are_flattened() {
        let fields = resolve_fields(&user(), &["json"]);
        let names: Vec<_> = fields.iter().map(|f| f.name).collect();
        assert_eq!(names, ["id", "name", "Email", "nickname"]);
        assert_eq!(fields[0].path, [0, 0]);
        assert_eq!(fields[0].candidates().collect::<Vec<_>>(), ["id", "ID"]);
    }

    #[test]
    fn field_tags_by_declared_name() {
        let tags = struct_field_tags(&user(), "yaml");
        assert_eq!(tags.get("Nick"), Some(&"nick"));
        assert_eq!(tags.len(), 1);
        assert_eq!(struct_field_names(&user(), &["yaml"]).len(), 5);
    }

    #[test]
    fn field_tags_flatten_and_trim() {
        let tags = struct_field_tags(&user(), "json");
        assert_eq!(
            tags.into_iter().collect::<Vec<_>>(),
            [("ID", "id"), ("Name", "name"), ("Nick", "nickname")]
        );
    }
}
