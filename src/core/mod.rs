/// Role-based access gate
pub mod access;
/// Customer records
pub mod customer;
/// Departments and the roles they own
pub mod department;
/// Line items shared by quotations and sales orders
pub mod document;
/// Enquiries and their items
pub mod enquiry;
/// Status history and document comments
pub mod history;
/// Bulk customer import
pub mod import;
/// Product catalog
pub mod product;
/// Quotations, revisions and conversion to sales orders
pub mod quotation;
/// Document summaries and rendering
pub mod report;
/// Sales orders
pub mod sales_order;
/// Business identifier series
pub mod sequence;
/// Document status machines
pub mod status;
/// Line and document total calculation
pub mod totals;
/// Users and roles
pub mod user;
/// Shared input validation
pub mod validate;
