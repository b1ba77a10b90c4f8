use tracing::{debug, warn};

use crate::clients::Invoicer;
use crate::error::IntegrationError;
use crate::models::{Client, ClientQuery, NewClient};

/// Sent when a client has to be created without a known address.
pub const PLACEHOLDER_ADDRESS: &str = "Address";

/// What the ticket tells us about the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerIdentity {
    pub nif: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn canonical_name(name: &str) -> String {
    name.replace('.', "").trim().to_string()
}

fn new_client(identity: &CustomerIdentity) -> NewClient {
    NewClient {
        fiscal_id: present(&identity.nif).map(str::to_string),
        name: present(&identity.name).map(str::to_string),
        address: Some(PLACEHOLDER_ADDRESS.to_string()),
        mobile: present(&identity.phone).map(str::to_string),
        external_reference: present(&identity.phone).map(str::to_string),
    }
}

/// Finds or creates the billing client: by fiscal id, then by phone (stored as
/// the client's external reference), then by name. Ambiguous matches pick the
/// first result. Returns `None` when nothing identifies the customer, which
/// invoices the final consumer.
pub async fn resolve_client(
    invoicer: &dyn Invoicer,
    identity: &CustomerIdentity,
) -> Result<Option<i64>, IntegrationError> {
    if let Some(nif) = present(&identity.nif) {
        let clients = invoicer
            .search_clients(&ClientQuery::FiscalId(nif.to_string()))
            .await?;
        if let Some(client) = clients.first() {
            if clients.len() > 1 {
                warn!("Found {} clients for nif {}. Will choose first {}", clients.len(), nif, client.id);
            }
            debug!("Found existing client for nif {}", nif);
            return Ok(Some(client.id));
        }
        let created = invoicer.create_client(&new_client(identity)).await?;
        debug!("Created client {} for nif {}", created.id, nif);
        return Ok(Some(created.id));
    }

    if let Some(phone) = present(&identity.phone) {
        let clients = invoicer
            .search_clients(&ClientQuery::ExternalReference(phone.to_string()))
            .await?;
        if let Some(client) = clients.first() {
            if clients.len() > 1 {
                warn!("Found {} clients for mobile {}. Will choose first {}", clients.len(), phone, client.id);
            }
            debug!("Found existing client for mobile {}", phone);
            return Ok(Some(client.id));
        }
        let created = invoicer.create_client(&new_client(identity)).await?;
        debug!("Created client {} for mobile {}", created.id, phone);
        return Ok(Some(created.id));
    }

    if let Some(name) = present(&identity.name) {
        let wanted = canonical_name(name);
        let clients = invoicer
            .search_clients(&ClientQuery::Name(name.to_string()))
            .await?;
        // only anonymous clients, a client with nif or mobile belongs to someone else
        let matches: Vec<&Client> = clients
            .iter()
            .filter(|c| present(&c.fiscal_id).is_none() && present(&c.mobile).is_none())
            .filter(|c| c.name.as_deref().map(canonical_name).as_deref() == Some(wanted.as_str()))
            .collect();

        if let Some(client) = matches.first() {
            if matches.len() > 1 {
                warn!("Found more than one match by name {}. Will choose first {}", name, client.id);
            }
            return Ok(Some(client.id));
        }
        let created = invoicer.create_client(&new_client(identity)).await?;
        debug!("Not found any matches by name. Created client {} {}", created.id, name);
        return Ok(Some(created.id));
    }

    Ok(None)
}
