//! Reference lookups used by the resolution cascade.
//!
//! [`CrmLookup`] is the read contract against reference data. Every method
//! returns candidate rows in store order; picking a usable candidate is the
//! cascade's job, not the lookup's. [`ReferenceIndex`] is the in-memory
//! implementation, built once per run from a snapshot of the store.

use std::collections::HashMap;
use std::convert::Infallible;

use crate::model::{CrmAccount, ElevateAccount};

pub trait CrmLookup {
    type Error: std::fmt::Display;

    /// CRM rows whose CRM id or account number equals `key`.
    fn by_id_or_account_number(&self, key: &str) -> Result<Vec<CrmAccount>, Self::Error>;

    /// CRM rows reached through an Elevate account carrying this mandate reference.
    fn by_bridged_mandate_reference(&self, mandate_id: &str) -> Result<Vec<CrmAccount>, Self::Error>;

    /// CRM rows whose payment-processor id equals `customer_id`.
    fn by_processor_id(&self, customer_id: &str) -> Result<Vec<CrmAccount>, Self::Error>;

    /// CRM rows whose display name equals `name` exactly.
    fn by_exact_name(&self, name: &str) -> Result<Vec<CrmAccount>, Self::Error>;
}

type Postings = HashMap<String, Vec<usize>>;

/// Hash-indexed snapshot of the CRM and Elevate tables.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    crm: Vec<CrmAccount>,
    elevate: Vec<ElevateAccount>,
    crm_by_id: Postings,
    crm_by_account_number: Postings,
    crm_by_processor_id: Postings,
    crm_by_name: Postings,
    elevate_by_mandate_reference: Postings,
}

fn post(map: &mut Postings, key: &str, pos: usize) {
    map.entry(key.to_string()).or_default().push(pos);
}

impl ReferenceIndex {
    /// Build from rows in store order. Position in the input defines candidate order.
    pub fn build(crm: Vec<CrmAccount>, elevate: Vec<ElevateAccount>) -> Self {
        let mut index = Self::default();

        for (pos, a) in crm.iter().enumerate() {
            post(&mut index.crm_by_id, &a.crm_id, pos);
            post(&mut index.crm_by_account_number, &a.account_number, pos);
            post(&mut index.crm_by_processor_id, &a.processor_id, pos);
            post(&mut index.crm_by_name, &a.name, pos);
        }
        for (pos, e) in elevate.iter().enumerate() {
            post(&mut index.elevate_by_mandate_reference, &e.mandate_reference, pos);
        }

        index.crm = crm;
        index.elevate = elevate;
        index
    }

    pub fn crm_count(&self) -> usize {
        self.crm.len()
    }

    pub fn elevate_count(&self) -> usize {
        self.elevate.len()
    }

    fn postings<'a>(map: &'a Postings, key: &str) -> &'a [usize] {
        map.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn rows(&self, positions: impl IntoIterator<Item = usize>) -> Vec<CrmAccount> {
        positions.into_iter().map(|p| self.crm[p].clone()).collect()
    }
}

impl CrmLookup for ReferenceIndex {
    type Error = Infallible;

    fn by_id_or_account_number(&self, key: &str) -> Result<Vec<CrmAccount>, Infallible> {
        let mut positions: Vec<usize> = Self::postings(&self.crm_by_id, key)
            .iter()
            .chain(Self::postings(&self.crm_by_account_number, key))
            .copied()
            .collect();
        positions.sort_unstable();
        positions.dedup();
        Ok(self.rows(positions))
    }

    fn by_bridged_mandate_reference(&self, mandate_id: &str) -> Result<Vec<CrmAccount>, Infallible> {
        let mut positions = Vec::new();
        for &e in Self::postings(&self.elevate_by_mandate_reference, mandate_id) {
            let account_number = &self.elevate[e].account_number;
            positions.extend_from_slice(Self::postings(&self.crm_by_account_number, account_number));
        }
        Ok(self.rows(positions))
    }

    fn by_processor_id(&self, customer_id: &str) -> Result<Vec<CrmAccount>, Infallible> {
        Ok(self.rows(Self::postings(&self.crm_by_processor_id, customer_id).iter().copied()))
    }

    fn by_exact_name(&self, name: &str) -> Result<Vec<CrmAccount>, Infallible> {
        Ok(self.rows(Self::postings(&self.crm_by_name, name).iter().copied()))
    }
}
