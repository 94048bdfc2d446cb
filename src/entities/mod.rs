//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod access;
pub mod customer;
pub mod department;
pub mod document_comment;
pub mod enquiry;
pub mod enquiry_item;
pub mod product;
pub mod quotation;
pub mod quotation_item;
pub mod quotation_revision;
pub mod role;
pub mod sales_order;
pub mod sales_order_item;
pub mod sequence_counter;
pub mod status_history;
pub mod user;

// Re-export specific types to avoid conflicts
pub use access::{Column as AccessColumn, Entity as Access, Model as AccessModel};
pub use customer::{Column as CustomerColumn, Entity as Customer, Model as CustomerModel};
pub use department::{Column as DepartmentColumn, Entity as Department, Model as DepartmentModel};
pub use document_comment::{
    Column as DocumentCommentColumn, Entity as DocumentComment, Model as DocumentCommentModel,
};
pub use enquiry::{Column as EnquiryColumn, Entity as Enquiry, Model as EnquiryModel};
pub use enquiry_item::{
    Column as EnquiryItemColumn, Entity as EnquiryItem, Model as EnquiryItemModel,
};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use quotation::{Column as QuotationColumn, Entity as Quotation, Model as QuotationModel};
pub use quotation_item::{
    Column as QuotationItemColumn, Entity as QuotationItem, Model as QuotationItemModel,
};
pub use quotation_revision::{
    Column as QuotationRevisionColumn, Entity as QuotationRevision,
    Model as QuotationRevisionModel,
};
pub use role::{Column as RoleColumn, Entity as Role, Model as RoleModel};
pub use sales_order::{Column as SalesOrderColumn, Entity as SalesOrder, Model as SalesOrderModel};
pub use sales_order_item::{
    Column as SalesOrderItemColumn, Entity as SalesOrderItem, Model as SalesOrderItemModel,
};
pub use sequence_counter::{
    Column as SequenceCounterColumn, Entity as SequenceCounter, Model as SequenceCounterModel,
};
pub use status_history::{
    Column as StatusHistoryColumn, Entity as StatusHistory, Model as StatusHistoryModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
