mod common;

use chrono::Utc;
use common::TestApp;
use erp_service::models::{
    CustomerSnapshot, LineDiscountMode, SalesInvoice, SalesInvoiceItem, SalesInvoiceStatus,
};
use erp_service::services::SequenceStrategy;
use mongodb::bson::oid::ObjectId;
use rust_decimal_macros::dec;
use service_core::error::AppError;

fn customer() -> CustomerSnapshot {
    CustomerSnapshot {
        name: "Matara Cinnamon Exports".to_string(),
        address: None,
        phone: Some("+94 41 222 3344".to_string()),
        email: None,
    }
}

fn sample_invoice() -> SalesInvoice {
    let mut invoice = SalesInvoice::new(
        Utc::now(),
        customer(),
        vec![
            SalesInvoiceItem::new(ObjectId::new(), dec!(2), dec!(60)).unwrap(),
            SalesInvoiceItem::new(ObjectId::new(), dec!(1), dec!(80))
                .unwrap()
                .with_discount(dec!(10)),
        ],
        "bank_transfer",
    );
    invoice.discount = dec!(20);
    invoice.tax = dec!(5);
    invoice
}

#[tokio::test]
#[ignore] // Requires MongoDB
async fn saved_invoice_has_number_and_totals() {
    let app = TestApp::spawn().await;
    let mut invoice = sample_invoice();

    app.db.save_sales_invoice(&mut invoice).await.unwrap();

    let number = invoice.invoice_number.clone().unwrap();
    assert!(number.starts_with("SAL"));

    let stored = app.db.get_sales_invoice(&number).await.unwrap().unwrap();
    assert_eq!(stored.sub_total, dec!(200));
    assert_eq!(stored.total, dec!(189));
    assert_eq!(stored.payment_method, "bank_transfer");
}

#[tokio::test]
#[ignore] // Requires MongoDB
async fn line_discounts_apply_when_configured() {
    let app = TestApp::spawn_with(SequenceStrategy::Counter, LineDiscountMode::Apply).await;
    let mut invoice = sample_invoice();

    app.db.save_sales_invoice(&mut invoice).await.unwrap();

    assert_eq!(invoice.sub_total, dec!(190));
    assert_eq!(invoice.total, dec!(178.5));
}

#[tokio::test]
#[ignore] // Requires MongoDB
async fn invalid_customer_email_is_rejected() {
    let app = TestApp::spawn().await;
    let mut invoice = sample_invoice();
    invoice.customer.email = Some("not-an-email".to_string());

    let err = app.db.save_sales_invoice(&mut invoice).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
#[ignore] // Requires MongoDB
async fn cancelled_invoice_cannot_be_confirmed() {
    let app = TestApp::spawn().await;
    let mut invoice = sample_invoice();
    app.db.save_sales_invoice(&mut invoice).await.unwrap();
    let number = invoice.invoice_number.clone().unwrap();

    app.db
        .update_sales_invoice_status(&number, SalesInvoiceStatus::Cancelled)
        .await
        .unwrap();

    let err = app
        .db
        .update_sales_invoice_status(&number, SalesInvoiceStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
#[ignore] // Requires MongoDB
async fn delete_removes_the_invoice() {
    let app = TestApp::spawn().await;
    let mut invoice = sample_invoice();
    app.db.save_sales_invoice(&mut invoice).await.unwrap();
    let number = invoice.invoice_number.clone().unwrap();

    assert!(app.db.delete_sales_invoice(&number).await.unwrap());
    assert!(!app.db.delete_sales_invoice(&number).await.unwrap());
    assert!(app.db.get_sales_invoice(&number).await.unwrap().is_none());
}
