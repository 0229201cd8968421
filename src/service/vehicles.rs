use tracing::info;

use super::RaceService;
use crate::error::ServiceError;
use crate::model::{Vehicle, VehicleInput};
use crate::store::value::now;
use crate::store::{path, Document, DocumentStore, Filter, Query, Value};

impl<S: DocumentStore> RaceService<S> {
    /// All vehicles of a user. The user must exist.
    pub async fn list_vehicles(&self, user_id: &str) -> Result<Vec<Vehicle>, ServiceError> {
        self.require(&path::user(user_id)?, "user").await?;
        let docs = self.store.list(&path::user_vehicles(user_id)?).await?;
        Ok(docs.iter().map(Vehicle::from).collect())
    }

    /// One vehicle of a user.
    pub async fn get_vehicle(&self, user_id: &str, vehicle_id: &str) -> Result<Vehicle, ServiceError> {
        self.require(&path::user(user_id)?, "user").await?;
        let doc = self
            .require(&path::user_vehicles(user_id)?.doc(vehicle_id)?, "vehicle")
            .await?;
        Ok(Vehicle::from(&doc))
    }

    /// Create a vehicle; `createdAt` and `updatedAt` share one timestamp.
    pub async fn create_vehicle(
        &self,
        user_id: &str,
        auth_user_id: &str,
        input: &VehicleInput,
    ) -> Result<Vehicle, ServiceError> {
        self.owned_user(user_id, auth_user_id).await?;

        let timestamp = now();
        let mut fields = input.to_fields();
        fields.insert("createdAt".into(), Value::Timestamp(timestamp));
        fields.insert("updatedAt".into(), Value::Timestamp(timestamp));

        let id = self
            .store
            .create(&path::user_vehicles(user_id)?, fields.clone())
            .await?;
        info!(user_id = user_id, vehicle_id = %id, "Vehicle created");

        Ok(Vehicle::from(&Document::new(id, fields)))
    }

    /// Replace the editable fields of a vehicle. `createdAt` is left as stored.
    pub async fn update_vehicle(
        &self,
        user_id: &str,
        auth_user_id: &str,
        vehicle_id: &str,
        input: &VehicleInput,
    ) -> Result<Vehicle, ServiceError> {
        self.owned_user(user_id, auth_user_id).await?;
        let vehicle_path = path::user_vehicles(user_id)?.doc(vehicle_id)?;
        let mut doc = self.require(&vehicle_path, "vehicle").await?;

        let mut fields = input.to_fields();
        fields.insert("updatedAt".into(), Value::Timestamp(now()));
        self.store.update(&vehicle_path, fields.clone()).await?;
        info!(user_id = user_id, vehicle_id = vehicle_id, "Vehicle updated");

        doc.fields.extend(fields);
        Ok(Vehicle::from(&doc))
    }

    /// Permanently delete a vehicle.
    pub async fn delete_vehicle(
        &self,
        user_id: &str,
        auth_user_id: &str,
        vehicle_id: &str,
    ) -> Result<(), ServiceError> {
        self.owned_user(user_id, auth_user_id).await?;
        let vehicle_path = path::user_vehicles(user_id)?.doc(vehicle_id)?;
        self.require(&vehicle_path, "vehicle").await?;

        self.store.delete(&vehicle_path).await?;
        info!(user_id = user_id, vehicle_id = vehicle_id, "Vehicle deleted");
        Ok(())
    }

    /// First vehicle of a user matching brand, model and year exactly.
    pub async fn search_vehicle(
        &self,
        user_id: &str,
        branch: &str,
        model: &str,
        year: i64,
    ) -> Result<Vehicle, ServiceError> {
        self.require(&path::user(user_id)?, "user").await?;

        let query = Query::new()
            .filter(Filter::eq("branch", branch))
            .filter(Filter::eq("model", model))
            .filter(Filter::eq("year", year))
            .limit(1);
        let docs = self.store.query(&path::user_vehicles(user_id)?, &query).await?;

        docs.first()
            .map(Vehicle::from)
            .ok_or_else(|| ServiceError::not_found("matching vehicle"))
    }

    /// The user must exist and its `authUserId` must equal the caller-supplied
    /// one. A mismatch is reported as not found.
    async fn owned_user(&self, user_id: &str, auth_user_id: &str) -> Result<Document, ServiceError> {
        let user = self.require(&path::user(user_id)?, "user").await?;
        let stored = user.str("authUserId").map(str::trim).unwrap_or_default();
        if stored != auth_user_id {
            return Err(ServiceError::not_found(format!(
                "user {} for auth user {}",
                user_id, auth_user_id
            )));
        }
        Ok(user)
    }
}
