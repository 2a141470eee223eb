use super::*;

fn filled(user_type: UserType) -> RegistrationForm {
    RegistrationForm {
        email: " Moussa@Example.com ".into(),
        password: "secret1".into(),
        confirm_password: "secret1".into(),
        phone: "+221 77 000 00 00".into(),
        username: "moussa".into(),
        full_name: "Moussa Ndiaye".into(),
        country: "SN".into(),
        city: "Dakar".into(),
        address: "Médina".into(),
        ..RegistrationForm::new(user_type)
    }
}

// =============================================================================
// step validation
// =============================================================================

#[test]
fn credentials_require_all_fields() {
    let mut form = filled(UserType::Simple);
    form.confirm_password.clear();
    let err = form.validate_step(Step::Credentials).unwrap_err();
    assert_eq!(err, RegistrationError::MissingFields);
    assert_eq!(err.to_string(), "Veuillez remplir tous les champs");
}

#[test]
fn credentials_require_matching_passwords() {
    let mut form = filled(UserType::Simple);
    form.confirm_password = "secret2".into();
    let err = form.validate_step(Step::Credentials).unwrap_err();
    assert_eq!(err.to_string(), PASSWORD_MISMATCH);
}

#[test]
fn credentials_require_six_characters() {
    let mut form = filled(UserType::Simple);
    form.password = "abc12".into();
    form.confirm_password = "abc12".into();
    assert_eq!(form.validate_step(Step::Credentials), Err(RegistrationError::PasswordTooShort));

    form.password = "éèàçùô".into();
    form.confirm_password = "éèàçùô".into();
    assert_eq!(form.validate_step(Step::Credentials), Ok(()));
}

#[test]
fn contact_rejects_blank_fields() {
    let mut form = filled(UserType::Simple);
    form.username = "   ".into();
    assert_eq!(form.validate_step(Step::Contact), Err(RegistrationError::MissingFields));
}

#[test]
fn location_has_its_own_message() {
    let mut form = filled(UserType::Simple);
    form.city.clear();
    let err = form.validate_step(Step::Location).unwrap_err();
    assert_eq!(err.to_string(), "Veuillez remplir tous les champs de localisation");
}

#[test]
fn payment_step_never_fails() {
    let form = RegistrationForm::new(UserType::Supplier);
    assert_eq!(form.validate_step(Step::Payment), Ok(()));
}

// =============================================================================
// navigation
// =============================================================================

#[test]
fn simple_account_submits_after_location() {
    let mut form = filled(UserType::Simple);
    assert_eq!(form.total_steps(), 3);
    assert_eq!(form.advance(), Ok(Advance::Next(Step::Contact)));
    assert_eq!(form.advance(), Ok(Advance::Next(Step::Location)));
    assert_eq!(form.advance(), Ok(Advance::Submit));
    assert_eq!(form.step(), Step::Location);
}

#[test]
fn supplier_gets_payment_step() {
    let mut form = filled(UserType::Supplier);
    assert_eq!(form.total_steps(), 4);
    form.advance().unwrap();
    form.advance().unwrap();
    assert_eq!(form.advance(), Ok(Advance::Next(Step::Payment)));
    assert_eq!(form.step().number(), 4);
    assert_eq!(form.advance(), Ok(Advance::Submit));
}

#[test]
fn failed_advance_stays_on_step() {
    let mut form = RegistrationForm::new(UserType::Simple);
    assert_eq!(form.advance(), Err(RegistrationError::MissingFields));
    assert_eq!(form.step(), Step::Credentials);
}

#[test]
fn back_walks_to_first_step() {
    let mut form = filled(UserType::Supplier);
    form.advance().unwrap();
    form.advance().unwrap();
    form.back();
    assert_eq!(form.step(), Step::Contact);
    form.back();
    form.back();
    assert_eq!(form.step(), Step::Credentials);
}

// =============================================================================
// into_request
// =============================================================================

#[test]
fn request_is_trimmed_and_lowercased() {
    let request = filled(UserType::Simple).into_request().unwrap();
    assert_eq!(request.email, "moussa@example.com");
    assert_eq!(request.user_type, UserType::Simple);
    assert_eq!(request.payment_reference, None);
}

#[test]
fn simple_account_drops_payment_reference() {
    let mut form = filled(UserType::Simple);
    form.payment_reference = "REF-1".into();
    assert_eq!(form.into_request().unwrap().payment_reference, None);
}

#[test]
fn supplier_reference_is_optional() {
    let mut form = filled(UserType::Supplier);
    form.payment_reference = "  ".into();
    assert_eq!(form.clone().into_request().unwrap().payment_reference, None);

    form.payment_reference = " WU-778899 ".into();
    assert_eq!(form.into_request().unwrap().payment_reference.as_deref(), Some("WU-778899"));
}

#[test]
fn into_request_revalidates() {
    let mut form = filled(UserType::Simple);
    form.address.clear();
    assert_eq!(form.into_request(), Err(RegistrationError::MissingLocation));
}

// =============================================================================
// payment options
// =============================================================================

#[test]
fn drc_pays_by_mobile_money() {
    let PaymentOptions::MobileMoney(numbers) = payment_options("cd") else {
        panic!("expected mobile money");
    };
    assert_eq!(numbers.len(), 2);
    assert!(matches!(payment_options("SN"), PaymentOptions::BankTransfer(_)));
    assert_eq!(SUPPLIER_FEE_USD, 5);
}
