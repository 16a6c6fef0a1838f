use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::models::BookingStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    #[serde(rename = "createdAt")]
    CreatedAt,
    #[serde(rename = "scheduledArrivalDate")]
    ScheduledArrival,
    #[serde(rename = "bookingPrice")]
    BookingPrice,
    #[serde(rename = "clientName")]
    ClientName,
    #[serde(rename = "carRegNo")]
    CarRegNo,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "createdAt",
            SortKey::ScheduledArrival => "scheduledArrivalDate",
            SortKey::BookingPrice => "bookingPrice",
            SortKey::ClientName => "clientName",
            SortKey::CarRegNo => "carRegNo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }
}

/// Filter, sort and window of one list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub status: Option<BookingStatus>,
    pub sort_by: SortKey,
    pub sort_dir: SortDir,
    pub page: u32,
    pub page_size: u32,
    pub car_reg_no: Option<String>,
    pub client_name: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            status: None,
            sort_by: SortKey::default(),
            sort_dir: SortDir::default(),
            page: 1,
            page_size: 20,
            car_reg_no: None,
            client_name: None,
        }
    }
}

impl ListQuery {
    pub fn at_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.page < 1 || self.page_size < 1 {
            return Err(ValidationError::InvalidPage);
        }
        Ok(())
    }

    /// Query-string pairs in the store's parameter names.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("limit", self.page_size.to_string()),
            ("sortBy", self.sort_by.as_str().to_string()),
            ("sortDir", self.sort_dir.as_str().to_string()),
        ];
        if let Some(status) = self.status {
            params.push(("status", status.as_str().to_string()));
        }
        if let Some(reg) = self.car_reg_no.as_deref().filter(|s| !s.trim().is_empty()) {
            params.push(("carRegNo", reg.trim().to_string()));
        }
        if let Some(name) = self.client_name.as_deref().filter(|s| !s.trim().is_empty()) {
            params.push(("clientName", name.trim().to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query() {
        let q = ListQuery::default();
        assert_eq!(q.page, 1);
        assert_eq!(q.page_size, 20);
        assert_eq!(q.sort_by, SortKey::CreatedAt);
        assert_eq!(q.sort_dir, SortDir::Desc);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_query_rejects_zero_page_or_size() {
        let q = ListQuery::default().at_page(0);
        assert_eq!(q.validate().unwrap_err(), ValidationError::InvalidPage);
        let q = ListQuery {
            page_size: 0,
            ..Default::default()
        };
        assert_eq!(q.validate().unwrap_err(), ValidationError::InvalidPage);
    }

    #[test]
    fn test_query_params() {
        let q = ListQuery {
            status: Some(BookingStatus::Arrived),
            sort_by: SortKey::ClientName,
            sort_dir: SortDir::Asc,
            page: 3,
            page_size: 10,
            car_reg_no: Some(" AB1 ".to_string()),
            client_name: Some("".to_string()),
        };
        let params = q.to_params();
        assert!(params.contains(&("page", "3".to_string())));
        assert!(params.contains(&("limit", "10".to_string())));
        assert!(params.contains(&("sortBy", "clientName".to_string())));
        assert!(params.contains(&("sortDir", "asc".to_string())));
        assert!(params.contains(&("status", "arrived".to_string())));
        assert!(params.contains(&("carRegNo", "AB1".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "clientName"));
    }
}
