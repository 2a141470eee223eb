//! Multi-step registration form.
//!
//! Simple accounts go through three steps (credentials, contact, location);
//! suppliers get a fourth where they may type the reference of the
//! registration fee they paid out of band. Validation messages are the ones
//! shown to users, in French.

use crate::backend::{SignUpRequest, UserType};

pub const MISSING_FIELDS: &str = "Veuillez remplir tous les champs";
pub const PASSWORD_MISMATCH: &str = "Les mots de passe ne correspondent pas";
pub const PASSWORD_TOO_SHORT: &str = "Le mot de passe doit contenir au moins 6 caractères";
pub const MISSING_LOCATION: &str = "Veuillez remplir tous les champs de localisation";

pub const MIN_PASSWORD_LEN: usize = 6;

/// Supplier registration fee, displayed only. Payment happens outside the app.
pub const SUPPLIER_FEE_USD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("{}", MISSING_FIELDS)]
    MissingFields,
    #[error("{}", PASSWORD_MISMATCH)]
    PasswordMismatch,
    #[error("{}", PASSWORD_TOO_SHORT)]
    PasswordTooShort,
    #[error("{}", MISSING_LOCATION)]
    MissingLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Credentials,
    Contact,
    Location,
    Payment,
}

impl Step {
    /// 1-based position shown as "Étape n sur m".
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::Credentials => 1,
            Self::Contact => 2,
            Self::Location => 3,
            Self::Payment => 4,
        }
    }
}

/// Result of pressing "Suivant".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next(Step),
    /// Every step validated; the form can be submitted.
    Submit,
}

/// Where to send the supplier fee, by country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOptions {
    MobileMoney(&'static [&'static str]),
    BankTransfer(&'static str),
}

const DRC_MOBILE_NUMBERS: &[&str] = &["+234979401982", "+243842578529"];

#[must_use]
pub fn payment_options(country_code: &str) -> PaymentOptions {
    if country_code.trim().eq_ignore_ascii_case("CD") {
        PaymentOptions::MobileMoney(DRC_MOBILE_NUMBERS)
    } else {
        PaymentOptions::BankTransfer("Western Union ou autre service de votre choix")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub user_type: UserType,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub phone: String,
    pub username: String,
    pub full_name: String,
    pub country: String,
    pub city: String,
    pub address: String,
    pub payment_reference: String,
    step: Option<Step>,
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

impl RegistrationForm {
    #[must_use]
    pub fn new(user_type: UserType) -> Self {
        Self { user_type, ..Self::default() }
    }

    #[must_use]
    pub fn step(&self) -> Step {
        self.step.unwrap_or(Step::Credentials)
    }

    #[must_use]
    pub fn total_steps(&self) -> u8 {
        match self.user_type {
            UserType::Supplier => 4,
            UserType::Simple => 3,
        }
    }

    /// Validate the fields owned by `step`.
    ///
    /// # Errors
    ///
    /// The first rule the step breaks.
    pub fn validate_step(&self, step: Step) -> Result<(), RegistrationError> {
        match step {
            Step::Credentials => {
                if blank(&self.email) || self.password.is_empty() || self.confirm_password.is_empty() {
                    return Err(RegistrationError::MissingFields);
                }
                if self.password != self.confirm_password {
                    return Err(RegistrationError::PasswordMismatch);
                }
                if self.password.chars().count() < MIN_PASSWORD_LEN {
                    return Err(RegistrationError::PasswordTooShort);
                }
                Ok(())
            }
            Step::Contact => {
                if blank(&self.phone) || blank(&self.username) || blank(&self.full_name) {
                    return Err(RegistrationError::MissingFields);
                }
                Ok(())
            }
            Step::Location => {
                if blank(&self.country) || blank(&self.city) || blank(&self.address) {
                    return Err(RegistrationError::MissingLocation);
                }
                Ok(())
            }
            // The reference is optional; the account stays pending either way.
            Step::Payment => Ok(()),
        }
    }

    /// Validate the current step and move forward.
    ///
    /// # Errors
    ///
    /// The current step's validation error; the step does not change.
    pub fn advance(&mut self) -> Result<Advance, RegistrationError> {
        let current = self.step();
        self.validate_step(current)?;
        let next = match (current, self.user_type) {
            (Step::Credentials, _) => Step::Contact,
            (Step::Contact, _) => Step::Location,
            (Step::Location, UserType::Supplier) => Step::Payment,
            (Step::Location, UserType::Simple) | (Step::Payment, _) => return Ok(Advance::Submit),
        };
        self.step = Some(next);
        Ok(Advance::Next(next))
    }

    /// Go back one step. No-op on the first step.
    pub fn back(&mut self) {
        self.step = match self.step() {
            Step::Credentials | Step::Contact => Some(Step::Credentials),
            Step::Location => Some(Step::Contact),
            Step::Payment => Some(Step::Location),
        };
    }

    /// Validate every step and build the sign-up payload.
    ///
    /// # Errors
    ///
    /// The first failing step's error.
    pub fn into_request(self) -> Result<SignUpRequest, RegistrationError> {
        for step in [Step::Credentials, Step::Contact, Step::Location] {
            self.validate_step(step)?;
        }
        let payment_reference = match self.user_type {
            UserType::Supplier => Some(self.payment_reference.trim().to_owned()).filter(|r| !r.is_empty()),
            UserType::Simple => None,
        };
        Ok(SignUpRequest {
            email: self.email.trim().to_ascii_lowercase(),
            password: self.password,
            phone: self.phone.trim().to_owned(),
            username: self.username.trim().to_owned(),
            full_name: self.full_name.trim().to_owned(),
            user_type: self.user_type,
            country: self.country.trim().to_owned(),
            city: self.city.trim().to_owned(),
            address: self.address.trim().to_owned(),
            payment_reference,
        })
    }
}

#[cfg(test)]
#[path = "registration_test.rs"]
mod tests;
