//! MongoDB adapter for erp-service.
//!
//! Every write goes through [`ErpDb::save`], which validates the document,
//! runs [`finalize`] and then inserts or replaces it. Document numbers carry a
//! unique index, so a colliding number surfaces as `AppError::DuplicateKey`.

use crate::models::{
    DocumentKind, ErpDocument, Payroll, PayrollStatus, PurchaseInvoice, PurchaseInvoiceStatus,
    SalesInvoice, SalesInvoiceStatus, TotalsPolicy,
};
use crate::services::finalize::finalize;
use crate::services::metrics::{DB_QUERY_DURATION, DOCUMENT_NUMBERS_ISSUED_TOTAL, ERRORS_TOTAL};
use crate::services::sequence::{SequenceSource, SequenceStrategy};
use async_trait::async_trait;
use chrono::Utc;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument, UpdateOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use service_core::error::AppError;
use tracing::{error, info, instrument, warn};
use validator::Validate;

/// Row in the `counters` collection, one per document kind.
#[derive(Debug, Serialize, Deserialize)]
struct SequenceCounter {
    #[serde(rename = "_id")]
    kind: String,
    seq: i64,
}

/// Collection holding documents of `kind`.
pub fn collection_name(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Payroll => "payrolls",
        DocumentKind::PurchaseInvoice => "purchase_invoices",
        DocumentKind::SalesInvoice => "sales_invoices",
    }
}

/// Field holding the generated number for `kind`.
pub fn number_field(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Payroll => "payroll_id",
        DocumentKind::PurchaseInvoice | DocumentKind::SalesInvoice => "invoice_number",
    }
}

#[derive(Clone)]
pub struct ErpDb {
    client: MongoClient,
    db: Database,
    strategy: SequenceStrategy,
    policy: TotalsPolicy,
}

impl ErpDb {
    pub async fn connect(
        uri: &str,
        database: &str,
        strategy: SequenceStrategy,
        policy: TotalsPolicy,
    ) -> Result<Self, AppError> {
        info!(database = %database, strategy = strategy.as_str(), "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self {
            client,
            db,
            strategy,
            policy,
        })
    }

    pub fn strategy(&self) -> SequenceStrategy {
        self.strategy
    }

    pub fn policy(&self) -> &TotalsPolicy {
        &self.policy
    }

    /// Unique indexes on document numbers plus status lookups.
    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        info!("Creating MongoDB indexes for erp-service");

        for kind in DocumentKind::ALL {
            let collection = self.raw_collection(kind);
            let field = number_field(kind);

            let mut keys = Document::new();
            keys.insert(field, 1);
            let number_index = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(format!("{}_unique", field))
                        .unique(true)
                        .build(),
                )
                .build();

            collection
                .create_index(number_index, None)
                .await
                .map_err(|e| {
                    error!(kind = %kind, "Failed to create {} index: {}", field, e);
                    AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
                })?;

            let status_index = IndexModel::builder()
                .keys(doc! { "status": 1 })
                .options(
                    IndexOptions::builder()
                        .name("status_idx".to_string())
                        .build(),
                )
                .build();

            collection
                .create_index(status_index, None)
                .await
                .map_err(|e| {
                    error!(kind = %kind, "Failed to create status index: {}", e);
                    AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
                })?;
        }

        let period_index = IndexModel::builder()
            .keys(doc! { "year": -1, "month": -1 })
            .options(
                IndexOptions::builder()
                    .name("period_idx".to_string())
                    .build(),
            )
            .build();

        self.raw_collection(DocumentKind::Payroll)
            .create_index(period_index, None)
            .await
            .map_err(|e| {
                error!("Failed to create payroll period index: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    /// Raise each counter to at least the number of stored documents, so a
    /// database numbered by document count continues without reissuing.
    pub async fn initialize_counters(&self) -> Result<(), AppError> {
        for kind in DocumentKind::ALL {
            let existing = self.count_documents(kind).await?;
            let existing = i64::try_from(existing).map_err(|e| {
                AppError::InternalError(anyhow::anyhow!("Document count overflow: {}", e))
            })?;

            self.counters()
                .update_one(
                    doc! { "_id": kind.as_str() },
                    doc! { "$max": { "seq": existing } },
                    UpdateOptions::builder().upsert(true).build(),
                )
                .await?;

            info!(kind = %kind, seed = existing, "Sequence counter ready");
        }
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                error!("MongoDB health check failed: {}", e);
                AppError::ServiceUnavailable
            })?;
        Ok(())
    }

    pub fn purchase_invoices(&self) -> Collection<PurchaseInvoice> {
        self.db.collection(collection_name(DocumentKind::PurchaseInvoice))
    }

    pub fn sales_invoices(&self) -> Collection<SalesInvoice> {
        self.db.collection(collection_name(DocumentKind::SalesInvoice))
    }

    pub fn payrolls(&self) -> Collection<Payroll> {
        self.db.collection(collection_name(DocumentKind::Payroll))
    }

    fn counters(&self) -> Collection<SequenceCounter> {
        self.db.collection("counters")
    }

    fn raw_collection(&self, kind: DocumentKind) -> Collection<Document> {
        self.db.collection(collection_name(kind))
    }

    #[instrument(skip(self))]
    pub async fn count_documents(&self, kind: DocumentKind) -> Result<u64, AppError> {
        let count = self
            .raw_collection(kind)
            .count_documents(doc! {}, None)
            .await?;
        Ok(count)
    }

    async fn increment_counter(&self, kind: DocumentKind) -> Result<u64, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let counter = self
            .counters()
            .find_one_and_update(
                doc! { "_id": kind.as_str() },
                doc! { "$inc": { "seq": 1_i64 } },
                options,
            )
            .await?
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Counter upsert for {} returned no document",
                    kind
                ))
            })?;

        u64::try_from(counter.seq).map_err(|_| {
            AppError::InternalError(anyhow::anyhow!(
                "Counter for {} holds a negative sequence {}",
                kind,
                counter.seq
            ))
        })
    }

    /// Validate, finalize and write `document`.
    ///
    /// The first save inserts and records the new `_id`; later saves replace
    /// the stored document wholesale. When the write fails, a number issued
    /// for it is removed again so a retry draws a fresh one.
    #[instrument(skip(self, collection, document), fields(kind = %D::KIND))]
    pub async fn save<D>(&self, collection: Collection<D>, document: &mut D) -> Result<(), AppError>
    where
        D: ErpDocument + Validate + Serialize + DeserializeOwned + Unpin + Send + Sync,
    {
        document.validate()?;

        let unnumbered = document.document_number().is_none();
        if let Err(err) = self.finalize_and_write(collection, document).await {
            if unnumbered {
                document.clear_document_number();
            }
            return Err(err);
        }

        info!(
            number = document.document_number().unwrap_or_default(),
            "Document saved"
        );

        Ok(())
    }

    async fn finalize_and_write<D>(
        &self,
        collection: Collection<D>,
        document: &mut D,
    ) -> Result<(), AppError>
    where
        D: ErpDocument + Serialize + DeserializeOwned + Unpin + Send + Sync,
    {
        let now = Utc::now();
        finalize(document, self, &self.policy, now).await?;
        document.touch(now);

        let operation = format!("save_{}", D::KIND);
        let timer = DB_QUERY_DURATION
            .with_label_values(&[operation.as_str()])
            .start_timer();

        match document.id() {
            None => {
                let result = collection
                    .insert_one(&*document, None)
                    .await
                    .map_err(write_error::<D>)?;
                if let Some(id) = result.inserted_id.as_object_id() {
                    document.set_id(id);
                }
            }
            Some(id) => {
                let result = collection
                    .replace_one(doc! { "_id": id }, &*document, None)
                    .await
                    .map_err(write_error::<D>)?;
                if result.matched_count == 0 {
                    return Err(AppError::NotFound(anyhow::anyhow!(
                        "{} {} no longer exists",
                        D::KIND,
                        id
                    )));
                }
            }
        }

        timer.observe_duration();
        Ok(())
    }

    async fn find_by_number<D>(
        &self,
        collection: Collection<D>,
        number: &str,
    ) -> Result<Option<D>, AppError>
    where
        D: ErpDocument + DeserializeOwned + Unpin + Send + Sync,
    {
        let mut filter = Document::new();
        filter.insert(number_field(D::KIND), number);
        Ok(collection.find_one(filter, None).await?)
    }

    async fn delete_by_number<D>(
        &self,
        collection: Collection<D>,
        number: &str,
    ) -> Result<bool, AppError>
    where
        D: ErpDocument + Send + Sync,
    {
        let mut filter = Document::new();
        filter.insert(number_field(D::KIND), number);
        let result = collection.delete_one(filter, None).await?;
        if result.deleted_count > 0 {
            info!(kind = %D::KIND, number = %number, "Document deleted");
        }
        Ok(result.deleted_count > 0)
    }

    // -------------------------------------------------------------------------
    // Purchase Invoice Operations
    // -------------------------------------------------------------------------

    pub async fn save_purchase_invoice(&self, invoice: &mut PurchaseInvoice) -> Result<(), AppError> {
        self.save(self.purchase_invoices(), invoice).await
    }

    pub async fn get_purchase_invoice(
        &self,
        invoice_number: &str,
    ) -> Result<Option<PurchaseInvoice>, AppError> {
        self.find_by_number(self.purchase_invoices(), invoice_number)
            .await
    }

    pub async fn delete_purchase_invoice(&self, invoice_number: &str) -> Result<bool, AppError> {
        self.delete_by_number(self.purchase_invoices(), invoice_number)
            .await
    }

    pub async fn update_purchase_invoice_status(
        &self,
        invoice_number: &str,
        status: PurchaseInvoiceStatus,
    ) -> Result<PurchaseInvoice, AppError> {
        let mut invoice = self
            .get_purchase_invoice(invoice_number)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Purchase invoice {} not found",
                    invoice_number
                ))
            })?;

        if !invoice.status.can_transition_to(status) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Purchase invoice {} cannot move from {} to {}",
                invoice_number,
                invoice.status.as_str(),
                status.as_str()
            )));
        }

        invoice.status = status;
        self.save_purchase_invoice(&mut invoice).await?;
        Ok(invoice)
    }

    // -------------------------------------------------------------------------
    // Sales Invoice Operations
    // -------------------------------------------------------------------------

    pub async fn save_sales_invoice(&self, invoice: &mut SalesInvoice) -> Result<(), AppError> {
        self.save(self.sales_invoices(), invoice).await
    }

    pub async fn get_sales_invoice(
        &self,
        invoice_number: &str,
    ) -> Result<Option<SalesInvoice>, AppError> {
        self.find_by_number(self.sales_invoices(), invoice_number)
            .await
    }

    pub async fn delete_sales_invoice(&self, invoice_number: &str) -> Result<bool, AppError> {
        self.delete_by_number(self.sales_invoices(), invoice_number)
            .await
    }

    pub async fn update_sales_invoice_status(
        &self,
        invoice_number: &str,
        status: SalesInvoiceStatus,
    ) -> Result<SalesInvoice, AppError> {
        let mut invoice = self
            .get_sales_invoice(invoice_number)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Sales invoice {} not found", invoice_number))
            })?;

        if !invoice.status.can_transition_to(status) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Sales invoice {} cannot move from {} to {}",
                invoice_number,
                invoice.status.as_str(),
                status.as_str()
            )));
        }

        invoice.status = status;
        self.save_sales_invoice(&mut invoice).await?;
        Ok(invoice)
    }

    // -------------------------------------------------------------------------
    // Payroll Operations
    // -------------------------------------------------------------------------

    pub async fn save_payroll(&self, payroll: &mut Payroll) -> Result<(), AppError> {
        self.save(self.payrolls(), payroll).await
    }

    pub async fn get_payroll(&self, payroll_id: &str) -> Result<Option<Payroll>, AppError> {
        self.find_by_number(self.payrolls(), payroll_id).await
    }

    pub async fn delete_payroll(&self, payroll_id: &str) -> Result<bool, AppError> {
        self.delete_by_number(self.payrolls(), payroll_id).await
    }

    /// Move a payroll along its lifecycle; `approved_by` is recorded when given.
    pub async fn update_payroll_status(
        &self,
        payroll_id: &str,
        status: PayrollStatus,
        approved_by: Option<ObjectId>,
    ) -> Result<Payroll, AppError> {
        let mut payroll = self.get_payroll(payroll_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Payroll {} not found", payroll_id))
        })?;

        if !payroll.status.can_transition_to(status) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Payroll {} cannot move from {} to {}",
                payroll_id,
                payroll.status.as_str(),
                status.as_str()
            )));
        }

        payroll.status = status;
        if approved_by.is_some() {
            payroll.approved_by = approved_by;
        }
        self.save_payroll(&mut payroll).await?;
        Ok(payroll)
    }
}

#[async_trait]
impl SequenceSource for ErpDb {
    async fn next_sequence(&self, kind: DocumentKind) -> Result<u64, AppError> {
        let sequence = match self.strategy {
            SequenceStrategy::Counter => self.increment_counter(kind).await?,
            SequenceStrategy::Count => self.count_documents(kind).await? + 1,
        };

        DOCUMENT_NUMBERS_ISSUED_TOTAL
            .with_label_values(&[kind.as_str(), self.strategy.as_str()])
            .inc();

        Ok(sequence)
    }
}

fn write_error<D: ErpDocument>(err: mongodb::error::Error) -> AppError {
    let err = AppError::from(err);
    ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
    if err.is_retryable() {
        warn!(kind = %D::KIND, error = %err, "Document number already taken");
    } else {
        error!(kind = %D::KIND, error = %err, "Failed to write document");
    }
    err
}
