//! Building entries from what the server returned. A materialized entry has no pending changes:
//! every attribute starts out [`ValueStatus::Unchanged`].

use std::str::FromStr;

use ldap3_proto::proto::LdapSearchResultEntry;

use crate::prelude::*;

impl Entry {
    /// Build an entry from a distinguished name and the raw attribute values of a search result.
    ///
    /// A value the codec refuses is logged and skipped, the rest of the entry is still built.
    /// An attribute name repeated in `pairs` is merged into one list.
    pub fn materialize<I>(dn: &str, pairs: I, codec: &ValueCodec) -> Result<Entry, OperationError>
    where
        I: IntoIterator<Item = (String, Vec<Vec<u8>>)>,
    {
        let mut entry = Entry::default();
        entry.replace_dn(Dn::from_str(dn)?);

        for (name, raw_values) in pairs {
            let values = raw_values
                .into_iter()
                .filter_map(|raw| {
                    codec
                        .decode(raw)
                        .map_err(|e| {
                            codec_warn!(attr = %name, ?e, "skipping undecodable value");
                        })
                        .ok()
                })
                .collect();
            entry.insert_unchanged(&name, values);
        }

        Ok(entry)
    }

    pub fn from_ldap(
        result: LdapSearchResultEntry,
        codec: &ValueCodec,
    ) -> Result<Entry, OperationError> {
        let LdapSearchResultEntry { dn, attributes } = result;
        Self::materialize(
            &dn,
            attributes.into_iter().map(|a| (a.atype, a.vals)),
            codec,
        )
    }
}
