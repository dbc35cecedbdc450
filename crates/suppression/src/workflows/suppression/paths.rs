//! Page URIs of the suppression journey.

pub const ROOT_URI: &str = "/suppression";
pub const APPLICANT_DETAILS_PAGE_URI: &str = "/suppression/applicant-details";
pub const ADDRESS_TO_REMOVE_PAGE_URI: &str = "/suppression/address-to-remove";
pub const SERVICE_ADDRESS_PAGE_URI: &str = "/suppression/service-address";
pub const DOCUMENT_DETAILS_PAGE_URI: &str = "/suppression/document-details";
pub const CONTACT_DETAILS_PAGE_URI: &str = "/suppression/contact-details";
pub const CHECK_YOUR_ANSWERS_PAGE_URI: &str = "/suppression/check-your-answers";
pub const PAYMENT_CALLBACK_URI: &str = "/suppression/payment-callback";
pub const CONFIRMATION_PAGE_URI: &str = "/suppression/confirmation";
pub const PAYMENT_REVIEW_PAGE_URI: &str = "/suppression/payment-review";
