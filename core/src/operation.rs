//! Operations that can be requested against a resource.
//!
//! # Design
//! One tagged union per capability. `Operation` wraps them so a single
//! builder can match exhaustively over every request shape the API accepts.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::resource::Capability;

/// Identifier of a remote record.
///
/// The service only issues positive identifiers. `0` is not rejected here;
/// it is sent unchanged and the service answers 404.
pub type Id = u64;

/// String-keyed JSON attributes of a record.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// CRUD operations on a collection resource.
#[derive(Debug, Clone, PartialEq)]
pub enum CrudOperation {
    Create(Attributes),
    List,
    Read(Id),
    Update(Id, Attributes),
    Delete(Id),
}

/// Payment operations on a payable document.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOperation {
    Pay { document: Id, instructions: PaymentInstructions },
    List { document: Id },
    Read { payment: Id, document: Id },
    Delete { payment: Id, document: Id },
}

impl PaymentOperation {
    pub fn document(&self) -> Id {
        match self {
            PaymentOperation::Pay { document, .. }
            | PaymentOperation::List { document }
            | PaymentOperation::Read { document, .. }
            | PaymentOperation::Delete { document, .. } => *document,
        }
    }

    pub fn payment(&self) -> Option<Id> {
        match self {
            PaymentOperation::Pay { .. } | PaymentOperation::List { .. } => None,
            PaymentOperation::Read { payment, .. } | PaymentOperation::Delete { payment, .. } => Some(*payment),
        }
    }
}

/// Send a document to its contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOperation {
    Deliver(Id),
}

/// Tax calculation and VAT validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxOperation {
    Calculate(Transaction),
    Validate { vat_number: String, country: String },
}

/// Any operation the request builder understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Crud(CrudOperation),
    Payment(PaymentOperation),
    Delivery(DeliveryOperation),
    Tax(TaxOperation),
}

impl Operation {
    pub fn capability(&self) -> Capability {
        match self {
            Operation::Crud(_) => Capability::Crud,
            Operation::Payment(_) => Capability::Payment,
            Operation::Delivery(_) => Capability::Delivery,
            Operation::Tax(_) => Capability::Tax,
        }
    }

    /// Short name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Crud(CrudOperation::Create(_)) => "create",
            Operation::Crud(CrudOperation::List) => "list",
            Operation::Crud(CrudOperation::Read(_)) => "read",
            Operation::Crud(CrudOperation::Update(..)) => "update",
            Operation::Crud(CrudOperation::Delete(_)) => "delete",
            Operation::Payment(PaymentOperation::Pay { .. }) => "pay",
            Operation::Payment(PaymentOperation::List { .. }) => "list payments",
            Operation::Payment(PaymentOperation::Read { .. }) => "read payment",
            Operation::Payment(PaymentOperation::Delete { .. }) => "delete payment",
            Operation::Delivery(DeliveryOperation::Deliver(_)) => "deliver",
            Operation::Tax(TaxOperation::Calculate(_)) => "calculate",
            Operation::Tax(TaxOperation::Validate { .. }) => "validate",
        }
    }
}

impl From<CrudOperation> for Operation {
    fn from(op: CrudOperation) -> Self {
        Operation::Crud(op)
    }
}

impl From<PaymentOperation> for Operation {
    fn from(op: PaymentOperation) -> Self {
        Operation::Payment(op)
    }
}

impl From<DeliveryOperation> for Operation {
    fn from(op: DeliveryOperation) -> Self {
        Operation::Delivery(op)
    }
}

impl From<TaxOperation> for Operation {
    fn from(op: TaxOperation) -> Self {
        Operation::Tax(op)
    }
}

/// How a payment was executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    CreditCard,
    Cash,
    WireTransfer,
    DirectDebit,
    Check,
    PromissoryNote,
    Iou,
    PayPal,
    Other,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 9] = [
        PaymentMethod::CreditCard,
        PaymentMethod::Cash,
        PaymentMethod::WireTransfer,
        PaymentMethod::DirectDebit,
        PaymentMethod::Check,
        PaymentMethod::PromissoryNote,
        PaymentMethod::Iou,
        PaymentMethod::PayPal,
        PaymentMethod::Other,
    ];

    /// Wire code sent as `payment_method`.
    pub fn code(self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Cash => "cash",
            PaymentMethod::WireTransfer => "wire_transfer",
            PaymentMethod::DirectDebit => "direct_debit",
            PaymentMethod::Check => "check",
            PaymentMethod::PromissoryNote => "promissory_note",
            PaymentMethod::Iou => "iou",
            PaymentMethod::PayPal => "paypal",
            PaymentMethod::Other => "other",
        }
    }
}

/// Instructions to record a payment against a document.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInstructions {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub date: Option<NaiveDate>,
}

impl PaymentInstructions {
    pub fn new(amount: Decimal, method: PaymentMethod) -> Self {
        Self {
            amount,
            method,
            date: None,
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Category of a taxable transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionCategory {
    Service,
    Book,
    Standard,
}

impl TransactionCategory {
    /// Wire code sent as `transaction_type`.
    pub fn code(self) -> &'static str {
        match self {
            TransactionCategory::Service => "eservice",
            TransactionCategory::Book => "ebook",
            TransactionCategory::Standard => "standard",
        }
    }
}

/// A transaction subject to taxes.
///
/// `country` is an ISO 3166-1 alpha-2 code. Optional fields left as `None`
/// are not sent; in particular no category is assumed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transaction {
    pub country: String,
    pub postal_code: Option<String>,
    pub vat_number: Option<String>,
    pub category: Option<TransactionCategory>,
}

impl Transaction {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            ..Self::default()
        }
    }

    pub fn postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = Some(postal_code.into());
        self
    }

    pub fn vat_number(mut self, vat_number: impl Into<String>) -> Self {
        self.vat_number = Some(vat_number.into());
        self
    }

    pub fn category(mut self, category: TransactionCategory) -> Self {
        self.category = Some(category);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_method_codes_are_distinct_snake_case() {
        let codes: std::collections::HashSet<_> = PaymentMethod::ALL.iter().map(|m| m.code()).collect();
        assert_eq!(codes.len(), PaymentMethod::ALL.len());
        assert!(codes.iter().all(|code| code.chars().all(|c| c.is_ascii_lowercase() || c == '_')));
        assert_eq!(PaymentMethod::PayPal.code(), "paypal");
    }

    #[test]
    fn payment_identifiers() {
        let pay = PaymentOperation::Pay {
            document: 7,
            instructions: PaymentInstructions::new(Decimal::new(100, 0), PaymentMethod::Cash),
        };
        assert_eq!(pay.document(), 7);
        assert_eq!(pay.payment(), None);

        let delete = PaymentOperation::Delete { payment: 3, document: 7 };
        assert_eq!(delete.document(), 7);
        assert_eq!(delete.payment(), Some(3));
    }

    #[test]
    fn transaction_builder_leaves_unset_fields_empty() {
        let transaction = Transaction::new("ES").postal_code("35018");
        assert_eq!(transaction.country, "ES");
        assert_eq!(transaction.postal_code.as_deref(), Some("35018"));
        assert!(transaction.vat_number.is_none());
        assert!(transaction.category.is_none());
    }

    #[test]
    fn operations_report_their_capability() {
        assert_eq!(Operation::from(CrudOperation::List).capability(), Capability::Crud);
        assert_eq!(Operation::from(DeliveryOperation::Deliver(1)).capability(), Capability::Delivery);
        let validate = TaxOperation::Validate {
            vat_number: "98765432X".into(),
            country: "ES".into(),
        };
        assert_eq!(Operation::from(validate).capability(), Capability::Tax);
    }
}
