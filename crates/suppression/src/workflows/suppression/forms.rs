use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{Address, ApplicantDetails, DocumentDetails, SuppressionData};
use super::paths::{
    ADDRESS_TO_REMOVE_PAGE_URI, APPLICANT_DETAILS_PAGE_URI, CHECK_YOUR_ANSWERS_PAGE_URI,
    CONTACT_DETAILS_PAGE_URI, DOCUMENT_DETAILS_PAGE_URI, SERVICE_ADDRESS_PAGE_URI,
};
use super::session::{SessionContext, SessionError, SessionStore};

/// Pages of the journey that collect input, in the order they are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormStep {
    ApplicantDetails,
    AddressToRemove,
    ServiceAddress,
    DocumentDetails,
    ContactDetails,
}

impl FormStep {
    pub const ALL: [FormStep; 5] = [
        FormStep::ApplicantDetails,
        FormStep::AddressToRemove,
        FormStep::ServiceAddress,
        FormStep::DocumentDetails,
        FormStep::ContactDetails,
    ];

    pub const fn path(self) -> &'static str {
        match self {
            FormStep::ApplicantDetails => APPLICANT_DETAILS_PAGE_URI,
            FormStep::AddressToRemove => ADDRESS_TO_REMOVE_PAGE_URI,
            FormStep::ServiceAddress => SERVICE_ADDRESS_PAGE_URI,
            FormStep::DocumentDetails => DOCUMENT_DETAILS_PAGE_URI,
            FormStep::ContactDetails => CONTACT_DETAILS_PAGE_URI,
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            FormStep::ApplicantDetails => "Applicant details",
            FormStep::AddressToRemove => "Address details",
            FormStep::ServiceAddress => "Service address",
            FormStep::DocumentDetails => "Document details",
            FormStep::ContactDetails => "Contact details",
        }
    }

    /// Page a successful submission redirects to.
    pub const fn next(self) -> &'static str {
        match self {
            FormStep::ApplicantDetails => ADDRESS_TO_REMOVE_PAGE_URI,
            FormStep::AddressToRemove => SERVICE_ADDRESS_PAGE_URI,
            FormStep::ServiceAddress => DOCUMENT_DETAILS_PAGE_URI,
            FormStep::DocumentDetails => CONTACT_DETAILS_PAGE_URI,
            FormStep::ContactDetails => CHECK_YOUR_ANSWERS_PAGE_URI,
        }
    }

    /// Previously saved answers for this step, used to prepopulate the page.
    pub fn values(self, data: &SuppressionData) -> BTreeMap<&'static str, String> {
        match self {
            FormStep::ApplicantDetails => data
                .applicant_details
                .as_ref()
                .map(ApplicantDetailsForm::from)
                .unwrap_or_default()
                .values(),
            FormStep::AddressToRemove => address_values(data.address_to_remove.as_ref()),
            FormStep::ServiceAddress => address_values(data.service_address.as_ref()),
            FormStep::ContactDetails => address_values(data.contact_address.as_ref()),
            FormStep::DocumentDetails => data
                .document_details
                .as_ref()
                .map(DocumentDetailsForm::from)
                .unwrap_or_default()
                .values(),
        }
    }
}

fn address_values(address: Option<&Address>) -> BTreeMap<&'static str, String> {
    address
        .map(AddressForm::from)
        .unwrap_or_default()
        .values()
}

/// Which address of the aggregate an address step writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSlot {
    AddressToRemove,
    ServiceAddress,
    ContactAddress,
}

impl AddressSlot {
    pub const fn step(self) -> FormStep {
        match self {
            AddressSlot::AddressToRemove => FormStep::AddressToRemove,
            AddressSlot::ServiceAddress => FormStep::ServiceAddress,
            AddressSlot::ContactAddress => FormStep::ContactDetails,
        }
    }

    fn store(self, address: Address, data: &mut SuppressionData) {
        let slot = match self {
            AddressSlot::AddressToRemove => &mut data.address_to_remove,
            AddressSlot::ServiceAddress => &mut data.service_address,
            AddressSlot::ContactAddress => &mut data.contact_address,
        };
        *slot = Some(address);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Every problem found in one submission, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    fn push(&mut self, field: &'static str, message: &'static str) {
        self.0.push(FieldError { field, message });
    }

    fn require(&mut self, field: &'static str, value: &str, message: &'static str) -> bool {
        let present = !value.trim().is_empty();
        if !present {
            self.push(field, message);
        }
        present
    }

    fn finish<T>(self, model: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.0.is_empty() {
            Ok(model())
        } else {
            Err(self)
        }
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn summary(&self) -> Vec<&'static str> {
        self.0.iter().map(|error| error.message).collect()
    }
}

/// Page model for a step; stands in for the rendered template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub step: FormStep,
    pub title: &'static str,
    pub values: BTreeMap<&'static str, String>,
    pub errors: Vec<FieldError>,
    pub error_summary: Vec<&'static str>,
}

impl StepView {
    pub fn new(step: FormStep, values: BTreeMap<&'static str, String>) -> Self {
        Self {
            step,
            title: step.title(),
            values,
            errors: Vec::new(),
            error_summary: Vec::new(),
        }
    }

    fn invalid(
        step: FormStep,
        values: BTreeMap<&'static str, String>,
        errors: ValidationErrors,
    ) -> Self {
        Self {
            error_summary: errors.summary(),
            errors: errors.0,
            ..Self::new(step, values)
        }
    }
}

/// Submitted fields of one step.
pub trait StepForm: DeserializeOwned + Send {
    type Model;

    fn validate(&self) -> Result<Self::Model, ValidationErrors>;

    /// Submitted values echoed back when the page is shown again.
    fn values(&self) -> BTreeMap<&'static str, String>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressForm {
    pub line1: String,
    pub line2: String,
    pub town: String,
    pub county: String,
    pub postcode: String,
    pub country: String,
}

impl StepForm for AddressForm {
    type Model = Address;

    fn validate(&self) -> Result<Address, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require("line1", &self.line1, "Building and street is required");
        errors.require("town", &self.town, "Town or city is required");
        errors.require("county", &self.county, "County is required");
        errors.require("postcode", &self.postcode, "Postcode is required");

        errors.finish(|| Address {
            line1: self.line1.trim().to_string(),
            line2: self.line2.trim().to_string(),
            town: self.town.trim().to_string(),
            county: self.county.trim().to_string(),
            postcode: self.postcode.trim().to_string(),
            country: self.country.trim().to_string(),
        })
    }

    fn values(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("line1", self.line1.clone()),
            ("line2", self.line2.clone()),
            ("town", self.town.clone()),
            ("county", self.county.clone()),
            ("postcode", self.postcode.clone()),
            ("country", self.country.clone()),
        ])
    }
}

impl From<&Address> for AddressForm {
    fn from(address: &Address) -> Self {
        Self {
            line1: address.line1.clone(),
            line2: address.line2.clone(),
            town: address.town.clone(),
            county: address.county.clone(),
            postcode: address.postcode.clone(),
            country: address.country.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApplicantDetailsForm {
    pub full_name: String,
    pub email_address: String,
    pub date_of_birth: String,
}

impl StepForm for ApplicantDetailsForm {
    type Model = ApplicantDetails;

    fn validate(&self) -> Result<ApplicantDetails, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require("fullName", &self.full_name, "Full name is required");
        if errors.require("emailAddress", &self.email_address, "Email address is required")
            && !looks_like_email(self.email_address.trim())
        {
            errors.push(
                "emailAddress",
                "Enter an email address in the correct format, like name@example.com",
            );
        }

        let date_of_birth = match self.date_of_birth.trim() {
            "" => None,
            raw => {
                let parsed = parse_date(raw);
                if parsed.is_none() {
                    errors.push("dateOfBirth", "Date of birth must be a real date");
                }
                parsed
            }
        };

        errors.finish(|| ApplicantDetails {
            full_name: self.full_name.trim().to_string(),
            email_address: self.email_address.trim().to_string(),
            date_of_birth,
        })
    }

    fn values(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("fullName", self.full_name.clone()),
            ("emailAddress", self.email_address.clone()),
            ("dateOfBirth", self.date_of_birth.clone()),
        ])
    }
}

impl From<&ApplicantDetails> for ApplicantDetailsForm {
    fn from(details: &ApplicantDetails) -> Self {
        Self {
            full_name: details.full_name.clone(),
            email_address: details.email_address.clone(),
            date_of_birth: details
                .date_of_birth
                .map(|date| date.to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentDetailsForm {
    pub company_name: String,
    pub company_number: String,
    pub description: String,
    pub date: String,
}

impl StepForm for DocumentDetailsForm {
    type Model = DocumentDetails;

    fn validate(&self) -> Result<DocumentDetails, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require("companyName", &self.company_name, "Company name is required");
        errors.require("companyNumber", &self.company_number, "Company number is required");
        errors.require("description", &self.description, "Document description is required");

        let mut date = None;
        if errors.require("date", &self.date, "Document date is required") {
            date = parse_date(self.date.trim());
            if date.is_none() {
                errors.push("date", "Document date must be a real date");
            }
        }

        match date {
            Some(date) => errors.finish(|| DocumentDetails {
                company_name: self.company_name.trim().to_string(),
                company_number: self.company_number.trim().to_ascii_uppercase(),
                description: self.description.trim().to_string(),
                date,
            }),
            None => Err(errors),
        }
    }

    fn values(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("companyName", self.company_name.clone()),
            ("companyNumber", self.company_number.clone()),
            ("description", self.description.clone()),
            ("date", self.date.clone()),
        ])
    }
}

impl From<&DocumentDetails> for DocumentDetailsForm {
    fn from(details: &DocumentDetails) -> Self {
        Self {
            company_name: details.company_name.clone(),
            company_number: details.company_number.clone(),
            description: details.description.clone(),
            date: details.date.to_string(),
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// Result of posting a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Redirect(&'static str),
    Invalid(StepView),
}

#[derive(Debug, thiserror::Error)]
pub enum FormStepError {
    #[error("session expected but none found")]
    SessionNotFound,
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Page model for `step`, prepopulated from the session when it holds an application.
pub fn step_view<S>(
    session: &SessionContext<'_, S>,
    step: FormStep,
) -> Result<StepView, SessionError>
where
    S: SessionStore + ?Sized,
{
    let values = match session.suppression_data()? {
        Some(data) => step.values(&data),
        None => step.values(&SuppressionData::default()),
    };
    Ok(StepView::new(step, values))
}

/// Validate `form`, merge it into the stored application and advance.
///
/// Validation runs before the session is consulted, so an invalid page is always shown again.
/// Only the first step may start a new application; later steps need one in the session.
pub fn submit_step<S, F>(
    session: &SessionContext<'_, S>,
    step: FormStep,
    form: &F,
    apply: impl FnOnce(F::Model, &mut SuppressionData),
) -> Result<StepOutcome, FormStepError>
where
    S: SessionStore + ?Sized,
    F: StepForm,
{
    let model = match form.validate() {
        Ok(model) => model,
        Err(errors) => {
            debug!(
                step = step.path(),
                failures = errors.errors().len(),
                "step validation failed"
            );
            return Ok(StepOutcome::Invalid(StepView::invalid(
                step,
                form.values(),
                errors,
            )));
        }
    };

    let mut data = match session.suppression_data()? {
        Some(data) => data,
        None if step == FormStep::ApplicantDetails => SuppressionData::new(),
        None => return Err(FormStepError::SessionNotFound),
    };

    apply(model, &mut data);
    session.set_suppression_data(&data)?;
    Ok(StepOutcome::Redirect(step.next()))
}

/// [`submit_step`] for the address pages.
pub fn submit_address<S>(
    session: &SessionContext<'_, S>,
    slot: AddressSlot,
    form: &AddressForm,
) -> Result<StepOutcome, FormStepError>
where
    S: SessionStore + ?Sized,
{
    submit_step(session, slot.step(), form, |address, data| {
        slot.store(address, data)
    })
}
