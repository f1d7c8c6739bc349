//! The fixed registry of remote resources.
//!
//! A resource contributes only its name to URL construction. Capabilities
//! record which operation families the service accepts for it, so the client
//! can reject e.g. paying a contact before anything is sent.

use std::fmt;

/// A named resource exposed by the accounting API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Contact,
    Invoice,
    Credit,
    Expense,
    Estimate,
    Receipt,
    Recurring,
    Item,
    Webhook,
    Evidence,
    Tax,
    Authorization,
    Ping,
}

impl Resource {
    pub const ALL: [Resource; 13] = [
        Resource::Contact,
        Resource::Invoice,
        Resource::Credit,
        Resource::Expense,
        Resource::Estimate,
        Resource::Receipt,
        Resource::Recurring,
        Resource::Item,
        Resource::Webhook,
        Resource::Evidence,
        Resource::Tax,
        Resource::Authorization,
        Resource::Ping,
    ];

    /// Path segment used to build every URL of this resource.
    pub fn name(self) -> &'static str {
        match self {
            Resource::Contact => "contacts",
            Resource::Invoice => "invoices",
            Resource::Credit => "credits",
            Resource::Expense => "expenses",
            Resource::Estimate => "estimates",
            Resource::Receipt => "receipts",
            Resource::Recurring => "recurring",
            Resource::Item => "items",
            Resource::Webhook => "webhooks",
            Resource::Evidence => "evidences",
            Resource::Tax => "taxes",
            Resource::Authorization => "authorization",
            Resource::Ping => "ping",
        }
    }

    pub fn from_name(name: &str) -> Option<Resource> {
        Resource::ALL.into_iter().find(|resource| resource.name() == name)
    }

    pub fn supports(self, capability: Capability) -> bool {
        use Resource::*;
        match capability {
            Capability::Crud => matches!(
                self,
                Contact | Invoice | Credit | Expense | Estimate | Receipt | Recurring | Item | Webhook | Evidence
            ),
            Capability::Payment => matches!(self, Invoice | Expense),
            Capability::Delivery => matches!(self, Invoice | Receipt | Credit | Estimate),
            Capability::Tax => matches!(self, Tax),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A family of operations a resource may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Crud,
    Payment,
    Delivery,
    Tax,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Crud => "crud",
            Capability::Payment => "payment",
            Capability::Delivery => "delivery",
            Capability::Tax => "tax",
        };
        f.write_str(name)
    }
}
