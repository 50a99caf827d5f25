//! DynamoDB SDK error mapping.
//!
//! Classifies AWS SDK errors into the provider-independent taxonomy:
//! conditional-check failures become `ConditionFailed`, throttling and
//! internal-server classes become `TransientProvider` (retryable), everything
//! else becomes `FatalProvider`.

use std::fmt::Debug;

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use monotable_core::storage::StoreError;

/// Map a GetItem SDK error to StoreError.
pub(crate) fn map_get_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<GetItemError, R>,
) -> StoreError {
    match err.into_service_error() {
        GetItemError::ProvisionedThroughputExceededException(_) => {
            StoreError::TransientProvider("throughput exceeded".to_string())
        }
        GetItemError::RequestLimitExceeded(_) => {
            StoreError::TransientProvider("request limit exceeded".to_string())
        }
        GetItemError::InternalServerError(_) => {
            StoreError::TransientProvider("internal server error".to_string())
        }
        GetItemError::ResourceNotFoundException(_) => {
            StoreError::FatalProvider("table not found".to_string())
        }
        err => StoreError::FatalProvider(format!("GetItem failed: {err:?}")),
    }
}

/// Map a Query SDK error to StoreError.
pub(crate) fn map_query_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<QueryError, R>,
) -> StoreError {
    match err.into_service_error() {
        QueryError::ProvisionedThroughputExceededException(_) => {
            StoreError::TransientProvider("throughput exceeded".to_string())
        }
        QueryError::RequestLimitExceeded(_) => {
            StoreError::TransientProvider("request limit exceeded".to_string())
        }
        QueryError::InternalServerError(_) => {
            StoreError::TransientProvider("internal server error".to_string())
        }
        QueryError::ResourceNotFoundException(_) => {
            StoreError::FatalProvider("table or index not found".to_string())
        }
        err => StoreError::FatalProvider(format!("Query failed: {err:?}")),
    }
}

/// Map a PutItem SDK error to StoreError.
pub(crate) fn map_put_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<PutItemError, R>,
    condition: Option<&str>,
) -> StoreError {
    match err.into_service_error() {
        PutItemError::ConditionalCheckFailedException(_) => StoreError::ConditionFailed {
            operation: "put".to_string(),
            condition: condition.unwrap_or_default().to_string(),
        },
        PutItemError::ProvisionedThroughputExceededException(_) => {
            StoreError::TransientProvider("throughput exceeded".to_string())
        }
        PutItemError::RequestLimitExceeded(_) => {
            StoreError::TransientProvider("request limit exceeded".to_string())
        }
        PutItemError::InternalServerError(_) => {
            StoreError::TransientProvider("internal server error".to_string())
        }
        PutItemError::ResourceNotFoundException(_) => {
            StoreError::FatalProvider("table not found".to_string())
        }
        err => StoreError::FatalProvider(format!("PutItem failed: {err:?}")),
    }
}

/// Map an UpdateItem SDK error to StoreError.
pub(crate) fn map_update_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<UpdateItemError, R>,
    condition: &str,
) -> StoreError {
    match err.into_service_error() {
        UpdateItemError::ConditionalCheckFailedException(_) => StoreError::ConditionFailed {
            operation: "update".to_string(),
            condition: condition.to_string(),
        },
        UpdateItemError::ProvisionedThroughputExceededException(_) => {
            StoreError::TransientProvider("throughput exceeded".to_string())
        }
        UpdateItemError::RequestLimitExceeded(_) => {
            StoreError::TransientProvider("request limit exceeded".to_string())
        }
        UpdateItemError::InternalServerError(_) => {
            StoreError::TransientProvider("internal server error".to_string())
        }
        UpdateItemError::ResourceNotFoundException(_) => {
            StoreError::FatalProvider("table not found".to_string())
        }
        err => StoreError::FatalProvider(format!("UpdateItem failed: {err:?}")),
    }
}

/// Map a DeleteItem SDK error to StoreError.
pub(crate) fn map_delete_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<DeleteItemError, R>,
    condition: Option<&str>,
) -> StoreError {
    match err.into_service_error() {
        DeleteItemError::ConditionalCheckFailedException(_) => StoreError::ConditionFailed {
            operation: "delete".to_string(),
            condition: condition.unwrap_or_default().to_string(),
        },
        DeleteItemError::ProvisionedThroughputExceededException(_) => {
            StoreError::TransientProvider("throughput exceeded".to_string())
        }
        DeleteItemError::RequestLimitExceeded(_) => {
            StoreError::TransientProvider("request limit exceeded".to_string())
        }
        DeleteItemError::InternalServerError(_) => {
            StoreError::TransientProvider("internal server error".to_string())
        }
        DeleteItemError::ResourceNotFoundException(_) => {
            StoreError::FatalProvider("table not found".to_string())
        }
        err => StoreError::FatalProvider(format!("DeleteItem failed: {err:?}")),
    }
}
