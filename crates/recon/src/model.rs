use serde::Serialize;

use crate::classify::TargetTeam;
use crate::resolve::{Attempt, MatchMethod};

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// Billing-system account: bridges an account number to a mandate reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ElevateAccount {
    pub account_number: String,
    pub mandate_reference: String,
    pub customer_name: String,
}

/// CRM-side account profile, as held in the `crmAccounts` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrmAccount {
    pub crm_id: String,
    pub account_number: String,
    pub name: String,
    pub email: String,
    pub premise_address: String,
    pub stage_name: String,
    /// GoCardless customer id.
    pub processor_id: String,
    /// Zendesk user id.
    pub support_user_id: String,
}

impl CrmAccount {
    /// A row with neither a CRM id nor an account number cannot identify anyone.
    pub fn has_identity(&self) -> bool {
        !self.crm_id.is_empty() || !self.account_number.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// One lifecycle event (cancellation, failure) for a payment mandate.
///
/// Field order matches the `mandateEvents` table and the first 32 output columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MandateEvent {
    pub id: String,
    pub created_at: String,
    pub resource_type: String,
    pub action: String,
    pub details_origin: String,
    pub details_cause: String,
    pub details_description: String,
    pub details_scheme: String,
    pub details_reason_code: String,
    pub links_previous_customer_bank_account: String,
    pub links_new_customer_bank_account: String,
    pub links_parent_event: String,
    pub links_mandate: String,
    pub mandates_id: String,
    pub mandates_created_at: String,
    pub mandates_reference: String,
    pub mandates_status: String,
    pub mandates_scheme: String,
    pub mandates_next_possible_charge_date: String,
    pub mandates_payments_require_approval: String,
    pub mandates_links_customer_bank_account: String,
    pub mandates_links_creditor: String,
    pub customers_id: String,
    pub customers_given_name: String,
    pub customers_family_name: String,
    pub customers_company_name: String,
    pub customers_metadata_lead_id: String,
    pub customers_metadata_link: String,
    pub customers_metadata_xero: String,
    pub mandates_metadata_xero: String,
    pub imported_at: String,
    pub customers_name: String,
}

/// `imported_at` format, also the date stamp in default file names.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Number of columns an event occupies in the store and in the export.
pub const EVENT_COLUMN_COUNT: usize = 32;

impl MandateEvent {
    /// Given and family name joined by a single space, untrimmed.
    pub fn compose_name(given: &str, family: &str) -> String {
        format!("{given} {family}")
    }

    /// Column values in table order.
    pub fn fields(&self) -> [&str; EVENT_COLUMN_COUNT] {
        [
            &self.id,
            &self.created_at,
            &self.resource_type,
            &self.action,
            &self.details_origin,
            &self.details_cause,
            &self.details_description,
            &self.details_scheme,
            &self.details_reason_code,
            &self.links_previous_customer_bank_account,
            &self.links_new_customer_bank_account,
            &self.links_parent_event,
            &self.links_mandate,
            &self.mandates_id,
            &self.mandates_created_at,
            &self.mandates_reference,
            &self.mandates_status,
            &self.mandates_scheme,
            &self.mandates_next_possible_charge_date,
            &self.mandates_payments_require_approval,
            &self.mandates_links_customer_bank_account,
            &self.mandates_links_creditor,
            &self.customers_id,
            &self.customers_given_name,
            &self.customers_family_name,
            &self.customers_company_name,
            &self.customers_metadata_lead_id,
            &self.customers_metadata_link,
            &self.customers_metadata_xero,
            &self.mandates_metadata_xero,
            &self.imported_at,
            &self.customers_name,
        ]
    }

    /// Build an event from column values in table order.
    /// Missing trailing values are left empty.
    pub fn from_fields<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut v = values.into_iter().map(str::to_string);
        let mut next = || v.next().unwrap_or_default();
        Self {
            id: next(),
            created_at: next(),
            resource_type: next(),
            action: next(),
            details_origin: next(),
            details_cause: next(),
            details_description: next(),
            details_scheme: next(),
            details_reason_code: next(),
            links_previous_customer_bank_account: next(),
            links_new_customer_bank_account: next(),
            links_parent_event: next(),
            links_mandate: next(),
            mandates_id: next(),
            mandates_created_at: next(),
            mandates_reference: next(),
            mandates_status: next(),
            mandates_scheme: next(),
            mandates_next_possible_charge_date: next(),
            mandates_payments_require_approval: next(),
            mandates_links_customer_bank_account: next(),
            mandates_links_creditor: next(),
            customers_id: next(),
            customers_given_name: next(),
            customers_family_name: next(),
            customers_company_name: next(),
            customers_metadata_lead_id: next(),
            customers_metadata_link: next(),
            customers_metadata_xero: next(),
            mandates_metadata_xero: next(),
            imported_at: next(),
            customers_name: next(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution output
// ---------------------------------------------------------------------------

/// CRM fields copied onto a resolved event. All empty when unmatched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrmProfile {
    pub account_number: String,
    pub crm_id: String,
    pub name: String,
    pub email: String,
    pub premise_address: String,
    pub stage_name: String,
    pub processor_id: String,
    pub support_user_id: String,
}

impl CrmProfile {
    pub fn is_empty(&self) -> bool {
        self.crm_id.is_empty() && self.account_number.is_empty()
    }
}

impl From<CrmAccount> for CrmProfile {
    fn from(a: CrmAccount) -> Self {
        Self {
            account_number: a.account_number,
            crm_id: a.crm_id,
            name: a.name,
            email: a.email,
            premise_address: a.premise_address,
            stage_name: a.stage_name,
            processor_id: a.processor_id,
            support_user_id: a.support_user_id,
        }
    }
}

/// An event joined with its CRM profile and routed to a team.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRecord {
    pub event: MandateEvent,
    pub profile: CrmProfile,
    pub target_team: TargetTeam,
    pub method: Option<MatchMethod>,
    pub attempts: Vec<Attempt>,
}

/// Fixed export header: 32 event columns, then the CRM-derived columns.
pub const OUTPUT_HEADER: [&str; OUTPUT_COLUMN_COUNT] = [
    "id",
    "created_at",
    "resource_type",
    "action",
    "details_origin",
    "details_cause",
    "details_description",
    "details_scheme",
    "details_reason_code",
    "links_previous_customer_bank_account",
    "links_new_customer_bank_account",
    "links_parent_event",
    "links_mandate",
    "mandates_id",
    "mandates_created_at",
    "mandates_reference",
    "mandates_status",
    "mandates_scheme",
    "mandates_next_possible_charge_date",
    "mandates_payments_require_approval",
    "mandates_links_customer_bank_account",
    "mandates_links_creditor",
    "customers_id",
    "customers_given_name",
    "customers_family_name",
    "customers_company_name",
    "customers_metadata_leadID",
    "customers_metadata_link",
    "customers_metadata_xero",
    "mandates_metadata_xero",
    "imported_at",
    "customers_name",
    "crm_account_number",
    "crm_id",
    "crm_name",
    "crm_email",
    "crm_premise_address",
    "crm_stage_name",
    "crm_customer_name",
    "crm_gocardless_id",
    "target_team",
    "crm_zen_user_id",
];

pub const OUTPUT_COLUMN_COUNT: usize = 42;

impl ResolvedRecord {
    /// Values in `OUTPUT_HEADER` order.
    pub fn output_fields(&self) -> Vec<&str> {
        let mut row = Vec::with_capacity(OUTPUT_COLUMN_COUNT);
        row.extend_from_slice(&self.event.fields());
        let p = &self.profile;
        row.extend_from_slice(&[
            p.account_number.as_str(),
            p.crm_id.as_str(),
            p.name.as_str(),
            p.email.as_str(),
            p.premise_address.as_str(),
            p.stage_name.as_str(),
            // crm_customer_name has never been populated; kept for consumers of the layout
            "",
            p.processor_id.as_str(),
            self.target_team.as_str(),
            p.support_user_id.as_str(),
        ]);
        row
    }
}
