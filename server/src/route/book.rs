mod request;
mod response;

use crate::controller::Controller;
use crate::error::ErrorStatus;
use crate::handler::AppModule;
use crate::route::book::request::{
    CreateRequest, DeleteRequest, GetRequest, ListRequest, PurchasesRequest, Transformer,
    UpdateRequest,
};
use crate::route::book::response::Presenter;
use crate::route::purchase::response::Presenter as PurchasePresenter;
use application::service::{
    CreateBookService, DeleteBookService, GetBookService, GetPurchaseService, SearchBookService,
    UpdateBookService,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::Query;
use uuid::Uuid;

pub trait BookRouter {
    fn route_book(self) -> Self;
}

impl BookRouter for Router<AppModule> {
    fn route_book(self) -> Self {
        self.route(
            "/books",
            get(
                |State(module): State<AppModule>, Query(req): Query<ListRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(req)
                        .handle(|filter| async move { module.pgpool().search_books(filter).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            )
            .post(
                |State(module): State<AppModule>, Json(req): Json<CreateRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(req)
                        .handle(|dto| async move { module.pgpool().create_book(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                        .map(|response| (StatusCode::CREATED, response.into_response()))
                },
            ),
        )
        .route(
            "/books/categories",
            get(|State(module): State<AppModule>| async move {
                Controller::new((), Presenter)
                    .bypass(|| async move { module.pgpool().book_categories().await })
                    .await
                    .map_err(ErrorStatus::from)
            }),
        )
        .route(
            "/books/:id",
            get(
                |State(module): State<AppModule>, Path(id): Path<Uuid>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(GetRequest::new(id))
                        .handle(|dto| async move { module.pgpool().get_book(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            )
            .patch(
                |State(module): State<AppModule>,
                 Path(id): Path<Uuid>,
                 Json(req): Json<UpdateRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake((id, req))
                        .handle(|dto| async move { module.pgpool().update_book(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            )
            .delete(
                |State(module): State<AppModule>, Path(id): Path<Uuid>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(DeleteRequest::new(id))
                        .handle(|dto| async move { module.pgpool().delete_book(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/books/:id/purchases",
            get(
                |State(module): State<AppModule>, Path(id): Path<Uuid>| async move {
                    Controller::new(Transformer, PurchasePresenter)
                        .intake(PurchasesRequest::new(id))
                        .handle(|book_id| async move {
                            module.pgpool().purchases_by_book(book_id).await
                        })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
    }
}
