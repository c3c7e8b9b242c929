//! Field references and their per-compile name resolution.

use std::collections::HashMap;

use tracing::trace;

use crate::metadata::{FieldId, MetadataError, MetadataProvider, MetadataResult};
use crate::sql::{Token, TokenStream};

/// Reference to a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldRef {
    /// Opaque id resolved through the metadata provider.
    Id(FieldId),
    /// Field literal that already carries its column name.
    Name(String),
}

impl std::fmt::Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldRef::Id(id) => write!(f, "field {}", id),
            FieldRef::Name(name) => write!(f, "field '{}'", name),
        }
    }
}

/// Names resolved for one compile call.
///
/// Each distinct id hits the provider exactly once. Dropped with the call,
/// never shared between compiles.
#[derive(Debug, Clone, Default)]
pub struct FieldNames {
    by_id: HashMap<FieldId, String>,
}

impl FieldNames {
    /// Resolve every id in `refs`, one provider call per distinct id.
    pub fn resolve<'a, P>(
        provider: &P,
        refs: impl IntoIterator<Item = &'a FieldRef>,
    ) -> MetadataResult<Self>
    where
        P: MetadataProvider + ?Sized,
    {
        let mut names = Self::default();
        for field in refs {
            names.ensure(provider, field)?;
        }
        Ok(names)
    }

    /// Resolve `field` unless it is already known.
    ///
    /// Lets callers that only discover refs while rendering keep the
    /// one-call-per-distinct-id guarantee.
    pub fn ensure<P>(&mut self, provider: &P, field: &FieldRef) -> MetadataResult<()>
    where
        P: MetadataProvider + ?Sized,
    {
        if let FieldRef::Id(id) = field {
            if !self.by_id.contains_key(id) {
                let info = provider.resolve_field(*id)?;
                trace!(field_id = id, name = %info.name, "resolved field");
                self.by_id.insert(*id, info.name);
            }
        }
        Ok(())
    }

    /// Column name for `field`.
    pub fn name<'a>(&'a self, field: &'a FieldRef) -> MetadataResult<&'a str> {
        match field {
            FieldRef::Id(id) => self
                .by_id
                .get(id)
                .map(String::as_str)
                .ok_or(MetadataError::FieldNotFound(*id)),
            FieldRef::Name(name) => Ok(name),
        }
    }

    /// Quoted identifier token stream for `field`.
    pub fn ident(&self, field: &FieldRef) -> MetadataResult<TokenStream> {
        Ok(Token::Ident(self.name(field)?.to_string()).into())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{FieldInfo, StaticMetadata, TableInfo};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        inner: StaticMetadata,
        field_calls: AtomicUsize,
    }

    impl MetadataProvider for CountingProvider {
        fn resolve_table(&self, id: i64) -> MetadataResult<TableInfo> {
            self.inner.resolve_table(id)
        }

        fn resolve_field(&self, id: i64) -> MetadataResult<FieldInfo> {
            self.field_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.resolve_field(id)
        }
    }

    #[test]
    fn test_resolves_each_distinct_id_once() {
        let provider = CountingProvider {
            inner: StaticMetadata::new().with_field(1, "a").with_field(2, "b"),
            field_calls: AtomicUsize::new(0),
        };
        let refs = vec![
            FieldRef::Id(1),
            FieldRef::Id(2),
            FieldRef::Id(1),
            FieldRef::Name("c".into()),
            FieldRef::Id(2),
        ];

        let names = FieldNames::resolve(&provider, &refs).unwrap();

        assert_eq!(provider.field_calls.load(Ordering::SeqCst), 2);
        assert_eq!(names.len(), 2);
        assert_eq!(names.name(&FieldRef::Id(1)).unwrap(), "a");
        assert_eq!(names.name(&FieldRef::Name("c".into())).unwrap(), "c");
    }

    #[test]
    fn test_ensure_skips_known_ids() {
        let provider = CountingProvider {
            inner: StaticMetadata::new().with_field(1, "a"),
            field_calls: AtomicUsize::new(0),
        };
        let mut names = FieldNames::default();

        names.ensure(&provider, &FieldRef::Id(1)).unwrap();
        names.ensure(&provider, &FieldRef::Id(1)).unwrap();
        names.ensure(&provider, &FieldRef::Name("b".into())).unwrap();

        assert_eq!(provider.field_calls.load(Ordering::SeqCst), 1);
        assert_eq!(names.name(&FieldRef::Id(1)).unwrap(), "a");
    }

    #[test]
    fn test_unknown_id_fails() {
        let provider = StaticMetadata::new();
        let err = FieldNames::resolve(&provider, &[FieldRef::Id(9)]).unwrap_err();
        assert_eq!(err, MetadataError::FieldNotFound(9));
    }

    #[test]
    fn test_unresolved_lookup_fails() {
        let names = FieldNames::default();
        assert_eq!(
            names.name(&FieldRef::Id(4)),
            Err(MetadataError::FieldNotFound(4))
        );
    }
}
