//! Data Transfer Objects for the management API
//!
//! Request and response bodies exchanged with the platform. Where the two API
//! shapes disagree on field names, the request types are enums over
//! `ApiVersion` and serialize untagged.

pub mod application;
pub mod plan;
pub mod subscription;

use serde::{Deserialize, Serialize};

/// A listing response
///
/// Older endpoints return a bare JSON array, newer ones wrap it in
/// `{ "data": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Plain(Vec<T>),
    Paged { data: Vec<T> },
}

impl<T> Listing<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Listing::Plain(items) => items,
            Listing::Paged { data } => data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PlanRef;

    #[test]
    fn test_listing_accepts_both_shapes() {
        let plain: Listing<PlanRef> =
            serde_json::from_str(r#"[{"id":"p1","name":"gold"}]"#).unwrap();
        assert_eq!(plain.into_items()[0].id, "p1");

        let paged: Listing<PlanRef> = serde_json::from_str(
            r#"{"data":[{"id":"p2","name":"silver","status":"PUBLISHED"}],"pagination":{}}"#,
        )
        .unwrap();
        let items = paged.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "silver");
    }
}
