//! Declarative schema macro for record types

/// Declares a record struct and its [`Record`](crate::Record) implementation.
///
/// Every field is stored as an `Option`, an `id: Option<VertexId>` field is added,
/// and `Debug`, `Clone` and `Default` are derived. Equality and hashing use the id
/// only, compared through [`VertexId::key`](crate::VertexId::key), so two records
/// with the same id are the same record regardless of their field values. An
/// integer id and its decimal string form count as the same id, since ids read
/// back from the database are always strings.
///
/// ```
/// use vertex_ogm::{vertex_record, Record};
///
/// vertex_record! {
///     /// Someone in the graph.
///     pub struct Person: "person" {
///         pub name: String,
///         pub age: i64,
///     }
/// }
///
/// let fred = Person { name: Some("fred".into()), ..Default::default() };
/// assert_eq!(fred.label(), "person");
/// assert_eq!(Person::field_names(), &["name", "age"]);
/// ```
///
/// Dropping a record value never touches the database; deleting the vertex is
/// always an explicit `delete` call.
#[macro_export]
macro_rules! vertex_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $label:literal {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default)]
        $vis struct $name {
            pub id: ::core::option::Option<$crate::VertexId>,
            $(
                $(#[$field_meta])*
                $field_vis $field: ::core::option::Option<$ty>,
            )*
        }

        impl ::core::cmp::PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.id.as_ref().map($crate::VertexId::key) == other.id.as_ref().map($crate::VertexId::key)
            }
        }

        impl ::core::cmp::Eq for $name {}

        impl ::core::hash::Hash for $name {
            fn hash<H: ::core::hash::Hasher>(&self, state: &mut H) {
                ::core::hash::Hash::hash(&self.id.as_ref().map($crate::VertexId::key), state);
            }
        }

        impl $crate::Record for $name {
            const LABEL: &'static str = $label;

            fn id(&self) -> ::core::option::Option<&$crate::VertexId> {
                self.id.as_ref()
            }

            fn set_id(&mut self, id: ::core::option::Option<$crate::VertexId>) {
                self.id = id;
            }

            fn field_names() -> &'static [&'static str] {
                &[$(stringify!($field)),*]
            }

            fn fields(&self) -> ::std::vec::Vec<(&'static str, ::core::option::Option<$crate::PropertyValue>)> {
                ::std::vec![
                    $((
                        stringify!($field),
                        self.$field.clone().map($crate::FieldValue::into_property),
                    )),*
                ]
            }

            fn apply(
                &mut self,
                name: &str,
                value: ::core::option::Option<$crate::PropertyValue>,
            ) -> ::core::result::Result<(), $crate::OgmError> {
                match name {
                    $(
                        stringify!($field) => {
                            self.$field = match value {
                                ::core::option::Option::Some(value) => ::core::option::Option::Some(
                                    <$ty as $crate::FieldValue>::from_property(name, value)?,
                                ),
                                ::core::option::Option::None => ::core::option::Option::None,
                            };
                            ::core::result::Result::Ok(())
                        }
                    )*
                    _ => ::core::result::Result::Err($crate::OgmError::UnknownField {
                        label: $label,
                        field: name.to_string(),
                    }),
                }
            }

            fn empty() -> Self {
                <Self as ::core::default::Default>::default()
            }
        }
    };
}
