mod request;
pub(in crate::route) mod response;

use crate::controller::Controller;
use crate::error::ErrorStatus;
use crate::handler::AppModule;
use crate::route::purchase::request::{
    BulkCompleteRequest, BuyerStatisticsRequest, CancelRequest, CompleteRequest, CreateRequest,
    GetRequest, ListRequest, SellerStatisticsRequest, StatusChange, Transformer,
    UpdateStatusRequest,
};
use crate::route::purchase::response::Presenter;
use application::service::{
    BulkCompletePurchaseService, CancelPurchaseService, CompletePurchaseService,
    CreatePurchaseService, GetPurchaseService, PurchaseStatisticsService,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::Query;
use uuid::Uuid;

pub trait PurchaseRouter {
    fn route_purchase(self) -> Self;
}

impl PurchaseRouter for Router<AppModule> {
    fn route_purchase(self) -> Self {
        self.route(
            "/purchases",
            get(
                |State(module): State<AppModule>, Query(req): Query<ListRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(req)
                        .handle(|filter| async move {
                            module.pgpool().purchases_with_filters(filter).await
                        })
                        .await
                        .map_err(ErrorStatus::from)
                },
            )
            .post(
                |State(module): State<AppModule>, Json(req): Json<CreateRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(req)
                        .handle(|dto| async move { module.pgpool().create_purchase(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                        .map(|response| (StatusCode::CREATED, response.into_response()))
                },
            ),
        )
        .route(
            "/purchases/statistics",
            get(|State(module): State<AppModule>| async move {
                Controller::new((), Presenter)
                    .bypass(|| async move { module.pgpool().platform_statistics().await })
                    .await
                    .map_err(ErrorStatus::from)
            }),
        )
        .route(
            "/purchases/bulk-complete",
            post(
                |State(module): State<AppModule>, Json(req): Json<BulkCompleteRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(req)
                        .handle(|dto| async move {
                            module.pgpool().bulk_complete_purchases(dto).await
                        })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/purchases/:id",
            get(
                |State(module): State<AppModule>, Path(id): Path<Uuid>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(GetRequest::new(id))
                        .handle(|dto| async move { module.pgpool().get_purchase(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/purchases/:id/status",
            axum::routing::put(
                |State(module): State<AppModule>,
                 Path(id): Path<Uuid>,
                 Json(req): Json<UpdateStatusRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .try_intake((id, req))
                        .map_err(ErrorStatus::from)?
                        .handle(|change| async move {
                            match change {
                                StatusChange::Complete(dto) => {
                                    module.pgpool().complete_purchase(dto).await
                                }
                                StatusChange::Cancel(dto) => {
                                    module.pgpool().cancel_purchase(dto).await
                                }
                            }
                        })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/purchases/:id/complete",
            post(
                |State(module): State<AppModule>,
                 Path(id): Path<Uuid>,
                 req: Option<Json<CompleteRequest>>| async move {
                    let req = req.map(|Json(req)| req).unwrap_or_default();
                    Controller::new(Transformer, Presenter)
                        .intake((id, req))
                        .handle(|dto| async move { module.pgpool().complete_purchase(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/purchases/:id/cancel",
            post(
                |State(module): State<AppModule>, Path(id): Path<Uuid>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(CancelRequest::new(id))
                        .handle(|dto| async move { module.pgpool().cancel_purchase(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/purchases/buyer/:id/statistics",
            get(
                |State(module): State<AppModule>, Path(id): Path<Uuid>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(BuyerStatisticsRequest::new(id))
                        .handle(|buyer_id| async move {
                            module.pgpool().buyer_statistics(buyer_id).await
                        })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/purchases/seller/:id/statistics",
            get(
                |State(module): State<AppModule>, Path(id): Path<Uuid>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(SellerStatisticsRequest::new(id))
                        .handle(|seller_id| async move {
                            module.pgpool().seller_statistics(seller_id).await
                        })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
    }
}
