//! Cache key derivation from query specs.
//!
//! Fingerprinting is positional: predicate and ordering clauses are
//! hashed in insertion order, so the same clauses assembled in a
//! different order produce a different key. Eager-load and scope
//! names are sorted before hashing, because relation sets for one
//! logical query are frequently built through different code paths.

use sha2::{Digest, Sha256};

use super::{Pagination, QuerySpec, SelectShape};

/// Compute the cache key for a query spec under the given key prefix.
///
/// Output is a 64-character lowercase hex SHA-256 digest.
pub fn fingerprint(spec: &QuerySpec, prefix: &str) -> String {
    let mut hasher = Sha256::new();

    feed(&mut hasher, prefix);
    feed(&mut hasher, spec.entity());

    section(&mut hasher, "where", spec.predicates().len());
    for p in spec.predicates() {
        feed(&mut hasher, &p.column);
        feed(&mut hasher, &p.operator);
        section(&mut hasher, "bind", p.bindings.len());
        for b in &p.bindings {
            feed(&mut hasher, &b.canonical());
        }
    }

    section(&mut hasher, "order", spec.ordering().len());
    for o in spec.ordering() {
        feed(&mut hasher, &o.column);
        feed(&mut hasher, o.direction.as_str());
    }

    match spec.pagination() {
        Pagination::None => feed(&mut hasher, "page:none"),
        Pagination::LimitOffset { limit, offset } => {
            feed(&mut hasher, "page:limit");
            feed(&mut hasher, &limit.map(|n| n.to_string()).unwrap_or_default());
            feed(&mut hasher, &offset.map(|n| n.to_string()).unwrap_or_default());
        }
        Pagination::Cursor(token) => {
            feed(&mut hasher, "page:cursor");
            feed(&mut hasher, token);
        }
    }

    feed_sorted(&mut hasher, "with", spec.eager());
    feed_sorted(&mut hasher, "without", spec.eager_excluded());
    feed_sorted(&mut hasher, "scopes", spec.scopes());

    match spec.select_shape() {
        SelectShape::All => feed(&mut hasher, "select:*"),
        SelectShape::Columns(cols) => {
            section(&mut hasher, "select:cols", cols.len());
            for c in cols {
                feed(&mut hasher, c);
            }
        }
        SelectShape::Aggregate { function, column } => {
            feed(&mut hasher, "select:agg");
            feed(&mut hasher, function);
            feed(&mut hasher, column);
        }
    }

    hex::encode(hasher.finalize())
}

// Every field is length-prefixed so adjacent caller-controlled strings
// cannot collide by concatenation.
fn feed(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

fn section(hasher: &mut Sha256, label: &str, len: usize) {
    feed(hasher, label);
    hasher.update((len as u64).to_le_bytes());
}

fn feed_sorted(hasher: &mut Sha256, label: &str, names: &[String]) {
    let mut sorted: Vec<&str> = names.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();
    section(hasher, label, sorted.len());
    for name in sorted {
        feed(hasher, name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Direction;

    fn base() -> QuerySpec {
        QuerySpec::for_entity("post")
            .filter("published", "=", true)
            .order_by("created_at", Direction::Desc)
    }

    #[test]
    fn test_fingerprint_stability() {
        assert_eq!(fingerprint(&base(), "qs"), fingerprint(&base(), "qs"));
    }

    #[test]
    fn test_fingerprint_format() {
        let key = fingerprint(&base(), "qs");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_predicate_value_discriminates() {
        let published = QuerySpec::for_entity("post").filter("published", "=", true);
        let unpublished = QuerySpec::for_entity("post").filter("published", "=", false);
        assert_ne!(fingerprint(&published, "qs"), fingerprint(&unpublished, "qs"));
    }

    #[test]
    fn test_eager_load_discriminates() {
        let bare = base();
        let with_tags = base().with_relation("tags");
        assert_ne!(fingerprint(&bare, "qs"), fingerprint(&with_tags, "qs"));
    }

    #[test]
    fn test_eager_load_order_insensitive() {
        let a = base().with_relation("tags").with_relation("author");
        let b = base().with_relation("author").with_relation("tags");
        assert_eq!(fingerprint(&a, "qs"), fingerprint(&b, "qs"));
    }

    #[test]
    fn test_eager_exclusion_distinct_from_inclusion() {
        let with = base().with_relation("tags");
        let without = base().without_relation("tags");
        assert_ne!(fingerprint(&with, "qs"), fingerprint(&without, "qs"));
    }

    #[test]
    fn test_scope_order_insensitive() {
        let a = base().scope("recent").scope("featured");
        let b = base().scope("featured").scope("recent");
        assert_eq!(fingerprint(&a, "qs"), fingerprint(&b, "qs"));
    }

    #[test]
    fn test_predicate_order_is_positional() {
        let a = QuerySpec::for_entity("post")
            .filter("published", "=", true)
            .filter("views", ">", 10i64);
        let b = QuerySpec::for_entity("post")
            .filter("views", ">", 10i64)
            .filter("published", "=", true);
        assert_ne!(fingerprint(&a, "qs"), fingerprint(&b, "qs"));
    }

    #[test]
    fn test_pagination_discriminates() {
        let first = base().limit(10);
        let second = base().limit(10).offset(10);
        assert_ne!(fingerprint(&first, "qs"), fingerprint(&second, "qs"));
    }

    #[test]
    fn test_prefix_discriminates() {
        assert_ne!(fingerprint(&base(), "a"), fingerprint(&base(), "b"));
    }

    #[test]
    fn test_entity_discriminates() {
        let post = QuerySpec::for_entity("post").filter("id", "=", 1i64);
        let page = QuerySpec::for_entity("page").filter("id", "=", 1i64);
        assert_ne!(fingerprint(&post, "qs"), fingerprint(&page, "qs"));
    }

    #[test]
    fn test_select_shape_discriminates() {
        let all = base();
        let count = base().aggregate("count", "*");
        assert_ne!(fingerprint(&all, "qs"), fingerprint(&count, "qs"));
    }

    #[test]
    fn test_adjacent_fields_do_not_concatenate() {
        let a = QuerySpec::for_entity("post").filter("ab", "c", "x");
        let b = QuerySpec::for_entity("post").filter("a", "bc", "x");
        assert_ne!(fingerprint(&a, "qs"), fingerprint(&b, "qs"));
    }
}
