pub mod isbn;
pub mod ndlbibid;

use serde::{Deserialize, Serialize};

/// The identifier kinds NDL Search attaches to a bibliographic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Isbn,
    Jpno,
    NdlBibId,
}

impl IdentifierKind {
    pub const ALL: [IdentifierKind; 3] = [
        IdentifierKind::Isbn,
        IdentifierKind::Jpno,
        IdentifierKind::NdlBibId,
    ];

    /// Key used in the host's identifier map.
    pub fn as_str(self) -> &'static str {
        match self {
            IdentifierKind::Isbn => "isbn",
            IdentifierKind::Jpno => "jpno",
            IdentifierKind::NdlBibId => "ndlbibid",
        }
    }

    /// Value of the `xsi:type` attribute on `dc:identifier` in OpenSearch feeds.
    pub fn xsi_type(self) -> &'static str {
        match self {
            IdentifierKind::Isbn => "dcndl:ISBN",
            IdentifierKind::Jpno => "dcndl:JPNO",
            IdentifierKind::NdlBibId => "dcndl:NDLBibID",
        }
    }

    /// Key of the `identifier` object in the JSON export.
    pub fn export_key(self) -> &'static str {
        match self {
            IdentifierKind::Isbn => "ISBN",
            IdentifierKind::Jpno => "JPNO",
            IdentifierKind::NdlBibId => "NDLBibID",
        }
    }

    pub fn from_xsi_type(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.xsi_type() == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xsi_type_lookup() {
        assert_eq!(
            IdentifierKind::from_xsi_type("dcndl:NDLBibID"),
            Some(IdentifierKind::NdlBibId)
        );
        assert_eq!(IdentifierKind::from_xsi_type("dcndl:ISSN"), None);
    }
}
