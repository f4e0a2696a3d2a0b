//! Service-level checks of the purchase workflow running against the
//! in-memory adapter.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use application::service::{
    BulkCompletePurchaseService, CancelPurchaseService, CompletePurchaseService,
    CreateBookService, CreatePurchaseService, DeleteBookService, GetBookService,
    GetPurchaseService, PurchaseStatisticsService, RestockBookService, SearchBookService,
};
use application::transfer::{
    BookDto, BulkCompleteDto, CancelPurchaseDto, CompletePurchaseDto, CreateBookDto,
    CreatePurchaseDto, DeleteBookDto, GetBookDto, GetPurchaseDto, RestockBookDto,
};
use driver::database::MemoryDatabase;
use kernel::interface::query::{BookFilter, PurchaseFilter};
use kernel::prelude::entity::{BookCategory, BuyerId, PurchaseStatus};
use kernel::KernelError;

async fn listed_book(db: &MemoryDatabase, price: Decimal, quantity: i32) -> BookDto {
    db.create_book(CreateBookDto {
        title: "Dune".to_string(),
        description: Some("desert planet".to_string()),
        price,
        quantity,
        category: Some("fiction".to_string()),
        owner_id: Uuid::new_v4(),
        owner_name: "Frank".to_string(),
    })
    .await
    .expect("listing should be accepted")
}

fn purchase_request(book: &BookDto, quantity: i32, price: Decimal) -> CreatePurchaseDto {
    CreatePurchaseDto {
        book_id: book.id,
        buyer_id: Uuid::new_v4(),
        buyer_name: "Ada".to_string(),
        buyer_email: "ada@example.com".to_string(),
        quantity,
        price,
        notes: None,
        payment_method: Some("card".to_string()),
        transaction_id: None,
    }
}

async fn quantity_of(db: &MemoryDatabase, book: &BookDto) -> i32 {
    db.get_book(GetBookDto { id: book.id })
        .await
        .expect("book should still exist")
        .quantity
}

#[tokio::test]
async fn purchase_then_complete_keeps_stock_and_stamps_completion() {
    let db = MemoryDatabase::new();
    let book = listed_book(&db, dec!(20.00), 5).await;

    let purchase = db
        .create_purchase(purchase_request(&book, 2, dec!(20.00)))
        .await
        .expect("purchase should succeed");
    assert_eq!(purchase.status, PurchaseStatus::Pending);
    assert_eq!(purchase.total_price, dec!(40.00));
    assert_eq!(quantity_of(&db, &book).await, 3);

    let completed = db
        .complete_purchase(CompletePurchaseDto {
            id: purchase.id,
            transaction_id: Some("tx-42".to_string()),
        })
        .await
        .expect("pending purchase should complete");
    assert_eq!(completed.status, PurchaseStatus::Completed);
    assert!(completed.completed_at.is_some());
    assert_eq!(completed.transaction_id.as_deref(), Some("tx-42"));

    // completion moves no stock
    assert_eq!(quantity_of(&db, &book).await, 3);
}

#[tokio::test]
async fn last_copy_cannot_be_sold_twice() {
    let db = MemoryDatabase::new();
    let book = listed_book(&db, dec!(15.00), 1).await;

    db.create_purchase(purchase_request(&book, 1, dec!(15.00)))
        .await
        .expect("first buyer takes the last copy");
    assert_eq!(quantity_of(&db, &book).await, 0);

    let report = db
        .create_purchase(purchase_request(&book, 1, dec!(15.00)))
        .await
        .unwrap_err();
    assert!(matches!(
        report.current_context(),
        KernelError::BookNotAvailable
    ));
}

#[tokio::test]
async fn concurrent_buyers_get_exactly_one_copy() {
    let db = MemoryDatabase::new();
    let book = listed_book(&db, dec!(15.00), 1).await;

    let first = tokio::spawn({
        let db = db.clone();
        let request = purchase_request(&book, 1, dec!(15.00));
        async move { db.create_purchase(request).await }
    });
    let second = tokio::spawn({
        let db = db.clone();
        let request = purchase_request(&book, 1, dec!(15.00));
        async move { db.create_purchase(request).await }
    });

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(successes, 1);
    let sold_out = outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .all(|report| matches!(report.current_context(), KernelError::BookNotAvailable));
    assert!(sold_out);
    assert_eq!(quantity_of(&db, &book).await, 0);
}

#[tokio::test]
async fn price_tolerance_boundary() {
    let db = MemoryDatabase::new();
    let book = listed_book(&db, dec!(100.00), 9).await;

    // 1% off exactly is still acceptable
    db.create_purchase(purchase_request(&book, 1, dec!(101.00)))
        .await
        .expect("exact tolerance boundary should pass");
    db.create_purchase(purchase_request(&book, 1, dec!(99.00)))
        .await
        .expect("downward deviation within tolerance should pass");

    let report = db
        .create_purchase(purchase_request(&book, 1, dec!(101.01)))
        .await
        .unwrap_err();
    assert!(matches!(
        report.current_context(),
        KernelError::PriceMismatch
    ));

    // a rejected purchase moves no stock
    assert_eq!(quantity_of(&db, &book).await, 7);
}

#[tokio::test]
async fn terminal_purchases_reject_further_transitions() {
    let db = MemoryDatabase::new();
    let book = listed_book(&db, dec!(10.00), 6).await;

    let completed = db
        .create_purchase(purchase_request(&book, 1, dec!(10.00)))
        .await
        .unwrap();
    db.complete_purchase(CompletePurchaseDto {
        id: completed.id,
        transaction_id: None,
    })
    .await
    .unwrap();

    let cancelled = db
        .create_purchase(purchase_request(&book, 1, dec!(10.00)))
        .await
        .unwrap();
    db.cancel_purchase(CancelPurchaseDto { id: cancelled.id })
        .await
        .unwrap();

    for id in [completed.id, cancelled.id] {
        let complete_again = db
            .complete_purchase(CompletePurchaseDto {
                id,
                transaction_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            complete_again.current_context(),
            KernelError::InvalidState
        ));

        let cancel_again = db.cancel_purchase(CancelPurchaseDto { id }).await.unwrap_err();
        assert!(matches!(
            cancel_again.current_context(),
            KernelError::InvalidState
        ));
    }
}

#[tokio::test]
async fn cancellation_does_not_restock_without_explicit_restock() {
    let db = MemoryDatabase::new();
    let book = listed_book(&db, dec!(12.00), 5).await;

    let purchase = db
        .create_purchase(purchase_request(&book, 2, dec!(12.00)))
        .await
        .unwrap();
    assert_eq!(quantity_of(&db, &book).await, 3);

    db.cancel_purchase(CancelPurchaseDto { id: purchase.id })
        .await
        .unwrap();
    // inventory stays where the purchase left it
    assert_eq!(quantity_of(&db, &book).await, 3);

    db.restock_book(RestockBookDto {
        id: book.id,
        amount: 2,
    })
    .await
    .unwrap();
    assert_eq!(quantity_of(&db, &book).await, 5);
}

#[tokio::test]
async fn unknown_ids_report_not_found() {
    let db = MemoryDatabase::new();

    let get = db
        .get_purchase(GetPurchaseDto { id: Uuid::new_v4() })
        .await
        .unwrap_err();
    assert!(matches!(get.current_context(), KernelError::NotFound));

    let complete = db
        .complete_purchase(CompletePurchaseDto {
            id: Uuid::new_v4(),
            transaction_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(complete.current_context(), KernelError::NotFound));

    let missing_book = db
        .create_purchase(CreatePurchaseDto {
            book_id: Uuid::new_v4(),
            buyer_id: Uuid::new_v4(),
            buyer_name: "Ada".to_string(),
            buyer_email: "ada@example.com".to_string(),
            quantity: 1,
            price: dec!(10.00),
            notes: None,
            payment_method: None,
            transaction_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        missing_book.current_context(),
        KernelError::NotFound
    ));
}

#[tokio::test]
async fn books_with_purchase_history_cannot_be_deleted() {
    let db = MemoryDatabase::new();
    let book = listed_book(&db, dec!(10.00), 5).await;

    db.create_purchase(purchase_request(&book, 1, dec!(10.00)))
        .await
        .unwrap();

    let report = db.delete_book(DeleteBookDto { id: book.id }).await.unwrap_err();
    assert!(matches!(report.current_context(), KernelError::InvalidState));
    assert_eq!(quantity_of(&db, &book).await, 4);

    let fresh = listed_book(&db, dec!(10.00), 1).await;
    db.delete_book(DeleteBookDto { id: fresh.id }).await.unwrap();
    assert!(db.get_book(GetBookDto { id: fresh.id }).await.is_err());
}

#[tokio::test]
async fn status_queries_are_idempotent() {
    let db = MemoryDatabase::new();
    let book = listed_book(&db, dec!(10.00), 9).await;

    for _ in 0..3 {
        db.create_purchase(purchase_request(&book, 1, dec!(10.00)))
            .await
            .unwrap();
    }

    let first: Vec<Uuid> = db
        .purchases_by_status(PurchaseStatus::Pending)
        .await
        .unwrap()
        .into_iter()
        .map(|purchase| purchase.id)
        .collect();
    let second: Vec<Uuid> = db
        .purchases_by_status(PurchaseStatus::Pending)
        .await
        .unwrap()
        .into_iter()
        .map(|purchase| purchase.id)
        .collect();
    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[tokio::test]
async fn pending_queue_and_recent_completions() {
    let db = MemoryDatabase::new();
    let book = listed_book(&db, dec!(10.00), 9).await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        let purchase = db
            .create_purchase(purchase_request(&book, 1, dec!(10.00)))
            .await
            .unwrap();
        ids.push(purchase.id);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    db.complete_purchase(CompletePurchaseDto {
        id: ids[2],
        transaction_id: None,
    })
    .await
    .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    db.complete_purchase(CompletePurchaseDto {
        id: ids[1],
        transaction_id: None,
    })
    .await
    .unwrap();

    let pending = db.pending_purchases().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, ids[0]);

    // the most recently completed order leads, regardless of creation order
    let recent = db.recent_purchases(1).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, ids[1]);
}

#[tokio::test]
async fn bulk_completion_isolates_failures() {
    let db = MemoryDatabase::new();
    let book = listed_book(&db, dec!(10.00), 9).await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        let purchase = db
            .create_purchase(purchase_request(&book, 1, dec!(10.00)))
            .await
            .unwrap();
        ids.push(purchase.id);
    }
    db.cancel_purchase(CancelPurchaseDto { id: ids[1] })
        .await
        .unwrap();

    let outcome = db
        .bulk_complete_purchases(BulkCompleteDto { ids: ids.clone() })
        .await
        .unwrap();
    assert_eq!(outcome.completed.len(), 2);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].id, ids[1]);
    assert!(!outcome.errors[0].message.is_empty());
}

#[tokio::test]
async fn stock_is_conserved_across_random_sequences() {
    use rand::Rng;

    let db = MemoryDatabase::new();
    let initial = 50;
    let book = listed_book(&db, dec!(10.00), initial).await;

    let mut purchased = 0;
    let mut restocked = 0;
    for _ in 0..100 {
        if rand::thread_rng().gen_bool(0.7) {
            let amount = rand::thread_rng().gen_range(1..=4);
            match db
                .create_purchase(purchase_request(&book, amount, dec!(10.00)))
                .await
            {
                Ok(_) => purchased += amount,
                Err(report) => {
                    assert!(matches!(
                        report.current_context(),
                        KernelError::BookNotAvailable
                    ));
                }
            }
        } else {
            let amount = rand::thread_rng().gen_range(1..=3);
            db.restock_book(RestockBookDto {
                id: book.id,
                amount,
            })
            .await
            .unwrap();
            restocked += amount;
        }

        let quantity = quantity_of(&db, &book).await;
        assert!(quantity >= 0);
        assert_eq!(quantity, initial - purchased + restocked);
    }
}

#[tokio::test]
async fn statistics_roll_up_by_scope() {
    let db = MemoryDatabase::new();
    let book = listed_book(&db, dec!(10.00), 9).await;
    let buyer = Uuid::new_v4();

    let mut request = purchase_request(&book, 2, dec!(10.00));
    request.buyer_id = buyer;
    let first = db.create_purchase(request).await.unwrap();
    db.complete_purchase(CompletePurchaseDto {
        id: first.id,
        transaction_id: None,
    })
    .await
    .unwrap();

    let mut request = purchase_request(&book, 1, dec!(10.00));
    request.buyer_id = buyer;
    db.create_purchase(request).await.unwrap();

    let stats = db.buyer_statistics(buyer).await.unwrap();
    assert_eq!(stats.total_purchases, 2);
    assert_eq!(stats.total_books, 3);
    assert_eq!(stats.total_spent, dec!(30.00));
    assert_eq!(stats.completed_purchases, 1);
    assert_eq!(stats.pending_purchases, 1);

    let seller = db.seller_statistics(book.owner_id).await.unwrap();
    assert_eq!(seller.total_sales, 2);
    assert_eq!(seller.total_books_sold, 3);
    assert_eq!(seller.total_revenue, dec!(30.00));

    let platform = db.platform_statistics().await.unwrap();
    assert_eq!(platform.total_purchases, 2);
    assert_eq!(platform.total_buyers, 1);

    // unknown scopes aggregate to zero, not to an error
    let empty = db.buyer_statistics(Uuid::new_v4()).await.unwrap();
    assert_eq!(empty.total_purchases, 0);
    assert_eq!(empty.total_spent, Decimal::ZERO);
}

#[tokio::test]
async fn filtered_queries_compose_conjunctively() {
    let db = MemoryDatabase::new();
    let fiction = listed_book(&db, dec!(10.00), 9).await;
    let science = db
        .create_book(CreateBookDto {
            title: "Cosmos".to_string(),
            description: None,
            price: dec!(25.00),
            quantity: 4,
            category: Some("science".to_string()),
            owner_id: Uuid::new_v4(),
            owner_name: "Carl".to_string(),
        })
        .await
        .unwrap();

    let buyer = Uuid::new_v4();
    let mut request = purchase_request(&fiction, 3, dec!(10.00));
    request.buyer_id = buyer;
    db.create_purchase(request).await.unwrap();
    let mut request = purchase_request(&science, 1, dec!(25.00));
    request.buyer_id = buyer;
    db.create_purchase(request).await.unwrap();

    let filter = PurchaseFilter {
        buyer_id: Some(BuyerId::new(buyer)),
        total_min: Some(dec!(26.00)),
        ..Default::default()
    };
    let expensive = db.purchases_with_filters(filter).await.unwrap();
    assert_eq!(expensive.len(), 1);
    assert_eq!(expensive[0].book_id, fiction.id);

    let filter = BookFilter {
        category: Some(BookCategory::new("science")),
        available_only: true,
        ..Default::default()
    };
    let science_books = db.search_books(filter).await.unwrap();
    assert_eq!(science_books.len(), 1);
    assert_eq!(science_books[0].id, science.id);

    let categories = db.book_categories().await.unwrap();
    assert_eq!(categories, vec!["fiction".to_string(), "science".to_string()]);
}
