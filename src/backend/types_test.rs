use super::*;

fn profile(user_type: UserType, payment_status: PaymentStatus) -> Profile {
    Profile {
        id: "u1".into(),
        full_name: Some("Awa Diop".into()),
        phone: Some("+221 77 000 00 00".into()),
        country: Some("SN".into()),
        city: Some("Dakar".into()),
        address: Some("Plateau".into()),
        user_type,
        payment_status,
        ..Profile::default()
    }
}

// =============================================================================
// Identifier::parse
// =============================================================================

#[test]
fn identifier_with_at_is_email() {
    assert_eq!(Identifier::parse(" A@X.com "), Some(Identifier::Email("a@x.com".into())));
}

#[test]
fn identifier_digits_and_separators_is_phone() {
    assert_eq!(
        Identifier::parse("+221 77 000-00 (00)"),
        Some(Identifier::Phone("+221 77 000-00 (00)".into()))
    );
}

#[test]
fn identifier_plain_word_is_username() {
    assert_eq!(Identifier::parse("moussa"), Some(Identifier::Username("moussa".into())));
}

#[test]
fn identifier_separators_without_digits_is_username() {
    assert_eq!(Identifier::parse("(-)"), Some(Identifier::Username("(-)".into())));
}

#[test]
fn identifier_blank_is_none() {
    assert_eq!(Identifier::parse("   "), None);
}

#[test]
fn identifier_labels() {
    assert_eq!(Identifier::parse("a@x.com").unwrap().label(), "Email");
    assert_eq!(Identifier::parse("0700").unwrap().label(), "Téléphone");
    assert_eq!(Identifier::parse("awa").unwrap().label(), "Nom d'utilisateur");
}

// =============================================================================
// BackendError::display_message
// =============================================================================

#[test]
fn invalid_credentials_message_is_verbatim() {
    let err = BackendError::InvalidCredentials("Invalid login credentials".into());
    assert_eq!(err.display_message(), "Invalid login credentials");
}

#[test]
fn invalid_credentials_empty_message_uses_default() {
    let err = BackendError::InvalidCredentials(String::new());
    assert_eq!(err.display_message(), INVALID_CREDENTIALS_MESSAGE);
}

#[test]
fn network_error_is_generic() {
    let err = BackendError::Network("dns failure".into());
    assert_eq!(err.display_message(), GENERIC_FAILURE_MESSAGE);
    assert!(err.is_transient());
}

#[test]
fn service_4xx_is_not_transient() {
    let err = BackendError::Service { status: 404, body: String::new() };
    assert!(!err.is_transient());
    assert!(BackendError::Service { status: 503, body: String::new() }.is_transient());
}

// =============================================================================
// Identity
// =============================================================================

#[test]
fn supplier_unpaid_has_features_disabled() {
    let identity = Identity {
        id: "u1".into(),
        email: None,
        profile: Some(profile(UserType::Supplier, PaymentStatus::Pending)),
    };
    assert!(identity.is_supplier());
    assert!(!identity.supplier_features_enabled());
}

#[test]
fn supplier_paid_has_features_enabled() {
    let identity = Identity {
        id: "u1".into(),
        email: None,
        profile: Some(profile(UserType::Supplier, PaymentStatus::Paid)),
    };
    assert!(identity.supplier_features_enabled());
}

#[test]
fn identity_without_profile_is_simple() {
    let identity = Identity { id: "u1".into(), email: Some("a@x.com".into()), profile: None };
    assert_eq!(identity.user_type(), UserType::Simple);
    assert_eq!(identity.display_name(), "a@x.com");
    assert_eq!(identity.missing_profile_fields(), vec!["profile"]);
}

#[test]
fn missing_profile_fields_lists_blank_ones() {
    let mut p = profile(UserType::Simple, PaymentStatus::Pending);
    p.address = Some("  ".into());
    p.city = None;
    let identity = Identity { id: "u1".into(), email: None, profile: Some(p) };
    assert_eq!(identity.missing_profile_fields(), vec!["city", "address"]);
}

#[test]
fn profile_deserializes_with_unknown_payment_status() {
    let p: Profile = serde_json::from_value(serde_json::json!({
        "id": "u1",
        "user_type": "supplier",
        "payment_status": "refunded"
    }))
    .unwrap();
    assert_eq!(p.user_type, UserType::Supplier);
    assert_eq!(p.payment_status, PaymentStatus::Unknown);
    assert!(!p.is_verified);
}

#[test]
fn user_type_from_str() {
    assert_eq!("Supplier".parse::<UserType>(), Ok(UserType::Supplier));
    assert!("vendor".parse::<UserType>().is_err());
}

// =============================================================================
// ProfilePatch
// =============================================================================

#[test]
fn profile_patch_serializes_only_set_fields() {
    let patch = ProfilePatch { bio: Some("Grossiste".into()), ..ProfilePatch::default() };
    let json = serde_json::to_value(&patch).unwrap();
    assert_eq!(json, serde_json::json!({ "bio": "Grossiste" }));
    assert!(!patch.is_empty());
    assert!(ProfilePatch::default().is_empty());
}

#[test]
fn profile_patch_apply_trims_values() {
    let mut p = profile(UserType::Simple, PaymentStatus::Pending);
    ProfilePatch { city: Some(" Thiès ".into()), ..ProfilePatch::default() }.apply_to(&mut p);
    assert_eq!(p.city.as_deref(), Some("Thiès"));
    assert_eq!(p.country.as_deref(), Some("SN"));
}

#[test]
fn sign_up_request_never_serializes_password() {
    let req = SignUpRequest {
        email: "a@x.com".into(),
        password: "secret1".into(),
        phone: "0700".into(),
        username: "awa".into(),
        full_name: "Awa".into(),
        user_type: UserType::Simple,
        country: "SN".into(),
        city: "Dakar".into(),
        address: "Plateau".into(),
        payment_reference: None,
    };
    let json = serde_json::to_value(&req).unwrap();
    assert!(json.get("password").is_none());
    assert!(json.get("payment_reference").is_none());
    assert_eq!(json["user_type"], "simple");
}

#[test]
fn auth_event_ends_session() {
    assert!(AuthEvent::SignedOut.ends_session());
    assert!(AuthEvent::SessionExpired.ends_session());
    assert!(!AuthEvent::TokenRefreshed.ends_session());
}
