mod common;

use common::{all_capabilities, cashier, TestApp};
use orgpay::{
    domain::{OfficerCapabilities, Semester},
    error::AppError,
    service::{ProfileUpdate, PromotionRequest, Registration},
};

fn promotion(student_id: i64, organization_id: i64) -> PromotionRequest {
    PromotionRequest {
        student_id,
        organization_id,
        role: String::new(),
        capabilities: cashier(),
        is_super_officer: false,
    }
}

#[tokio::test]
async fn test_promote_student_into_child_organization() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let head = app.officer("allorg_head", "ALLORG", all_capabilities(), false).await?;
    let student = app.student("2024-00001", "BSCS", 2).await?;

    let officer = app
        .ctx
        .promotion_service
        .promote(&head, promotion(student.id, app.org("COMSCI").id))
        .await?;

    assert_eq!(officer.user_id, student.user_id);
    assert_eq!(officer.organization_id, app.org("COMSCI").id);
    assert_eq!(officer.employee_id, "COMSCI-2024-00001");
    assert_eq!(officer.role, "Officer");
    assert_eq!(officer.capabilities, cashier());
    assert!(officer.is_active);
    assert!(!officer.is_super_officer);

    // Promoting again is a conflict while the record is active
    let err = app
        .ctx
        .promotion_service
        .promote(&head, promotion(student.id, app.org("COMSCI").id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let scope = app.ctx.scope_service.scope_for_officer(&head).await?;
    let actions: Vec<String> = app
        .ctx
        .activity_log_repo
        .list_in_scope(&scope, head.user_id, 10)
        .await?
        .into_iter()
        .map(|log| log.action)
        .collect();
    assert_eq!(actions, vec!["officer_promoted".to_string()]);

    Ok(())
}

#[tokio::test]
async fn test_promotion_stays_inside_scope() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let comsci_head = app.officer("comsci_head", "COMSCI", all_capabilities(), false).await?;
    let cs_student = app.student("2024-00001", "BSCS", 1).await?;
    let mb_student = app.student("2024-00002", "BSMB", 1).await?;

    // Sibling organization
    let err = app
        .ctx
        .promotion_service
        .promote(&comsci_head, promotion(cs_student.id, app.org("MARINEBIO").id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Student from another program
    let err = app
        .ctx
        .promotion_service
        .promote(&comsci_head, promotion(mb_student.id, app.org("COMSCI").id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Without promotion authority
    let cashier_officer = app.officer("comsci_cashier", "COMSCI", cashier(), false).await?;
    let err = app
        .ctx
        .promotion_service
        .promote(&cashier_officer, promotion(cs_student.id, app.org("COMSCI").id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Own organization and program works
    app.ctx
        .promotion_service
        .promote(&comsci_head, promotion(cs_student.id, app.org("COMSCI").id))
        .await?;

    Ok(())
}

#[tokio::test]
async fn test_only_super_officers_grant_authority() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let head = app.officer("allorg_head", "ALLORG", all_capabilities(), false).await?;
    let admin = app.officer("admin", "ALLORG", all_capabilities(), true).await?;
    let student = app.student("2024-00001", "BSCS", 1).await?;

    let request = PromotionRequest {
        capabilities: all_capabilities(),
        ..promotion(student.id, app.org("COMSCI").id)
    };

    let err = app
        .ctx
        .promotion_service
        .promote(&head, request.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = app
        .ctx
        .promotion_service
        .promote(
            &head,
            PromotionRequest {
                is_super_officer: true,
                ..promotion(student.id, app.org("COMSCI").id)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let officer = app.ctx.promotion_service.promote(&admin, request).await?;
    assert!(officer.capabilities.can_promote_officers);

    Ok(())
}

#[tokio::test]
async fn test_demote_and_promote_again() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let head = app.officer("allorg_head", "ALLORG", all_capabilities(), false).await?;
    let student = app.student("2024-00001", "BSCS", 1).await?;

    let officer = app
        .ctx
        .promotion_service
        .promote(&head, promotion(student.id, app.org("COMSCI").id))
        .await?;

    let demoted = app.ctx.promotion_service.demote(&head, officer.id).await?;
    assert!(!demoted.is_active);
    assert_eq!(demoted.capabilities, OfficerCapabilities::none());

    let err = app
        .ctx
        .promotion_service
        .demote(&head, officer.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // The same record comes back
    let again = app
        .ctx
        .promotion_service
        .promote(
            &head,
            PromotionRequest {
                role: "Auditor".to_string(),
                ..promotion(student.id, app.org("IT").id)
            },
        )
        .await?;
    assert_eq!(again.id, officer.id);
    assert!(again.is_active);
    assert_eq!(again.role, "Auditor");
    assert_eq!(again.organization_id, app.org("IT").id);

    Ok(())
}

#[tokio::test]
async fn test_demote_guards() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let head = app.officer("allorg_head", "ALLORG", all_capabilities(), false).await?;
    let admin = app.officer("admin", "ALLORG", all_capabilities(), true).await?;
    let outsider = app.officer("jpia_head", "JPIA", all_capabilities(), false).await?;
    let target = app.officer("comsci_cashier", "COMSCI", cashier(), false).await?;

    let err = app.ctx.promotion_service.demote(&head, head.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = app.ctx.promotion_service.demote(&head, admin.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = app.ctx.promotion_service.demote(&outsider, target.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = app.ctx.promotion_service.demote(&head, 9_999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    app.ctx.promotion_service.demote(&admin, head.id).await?;

    Ok(())
}

fn registration(email: &str, username: &str) -> Registration {
    Registration {
        email: email.to_string(),
        username: username.to_string(),
        password: "long-enough-password".to_string(),
        first_name: "Maria".to_string(),
        middle_name: None,
        last_name: "Santos".to_string(),
        student_id_number: format!("ID-{}", username),
        course_code: "BSCS".to_string(),
        year_level: 1,
        phone_number: "09171234567".to_string(),
        academic_year: "2024-2025".to_string(),
        semester: Semester::First,
    }
}

#[tokio::test]
async fn test_register_student() -> anyhow::Result<()> {
    let app = TestApp::new().await?;

    let student = app
        .ctx
        .profile_service
        .register(registration("Maria.Santos@PSU.palawan.edu.ph", "msantos"))
        .await?;
    assert_eq!(student.email, "maria.santos@psu.palawan.edu.ph");
    assert_eq!(student.course_id, app.course("BSCS").id);

    let user = app.ctx.user_repo.find_by_id(student.user_id).await?.expect("user created");
    assert_eq!(user.username, "msantos");

    let err = app
        .ctx
        .profile_service
        .register(registration("someone@gmail.com", "outsider"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = app
        .ctx
        .profile_service
        .register(registration("maria.santos@psu.palawan.edu.ph", "another"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = app
        .ctx
        .profile_service
        .register(Registration {
            password: "short".to_string(),
            ..registration("new@psu.palawan.edu.ph", "newbie")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = app
        .ctx
        .profile_service
        .register(Registration {
            course_code: "NOPE".to_string(),
            ..registration("new@psu.palawan.edu.ph", "newbie")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn test_update_profile() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let student = app.student("2024-00001", "BSCS", 1).await?;
    let other = app.student("2024-00002", "BSCS", 1).await?;

    let updated = app
        .ctx
        .profile_service
        .update_profile(
            &student,
            ProfileUpdate {
                phone_number: Some("09998887777".to_string()),
                email: None,
                course_code: Some("BSIT".to_string()),
                year_level: Some(2),
            },
        )
        .await?;
    assert_eq!(updated.phone_number, "09998887777");
    assert_eq!(updated.course_id, app.course("BSIT").id);
    assert_eq!(updated.year_level, 2);
    assert_eq!(updated.email, student.email);

    let err = app
        .ctx
        .profile_service
        .update_profile(
            &student,
            ProfileUpdate {
                email: Some(other.email.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = app
        .ctx
        .profile_service
        .update_profile(
            &student,
            ProfileUpdate {
                year_level: Some(6),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}
