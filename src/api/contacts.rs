// Contacts, user search and friend requests

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::ClientResult;
use crate::models::{Contact, FriendRequest, UserSummary};

#[derive(Deserialize)]
struct ContactsBody {
    contacts: Vec<Contact>,
}

#[derive(Deserialize)]
struct UsersBody {
    users: Vec<UserSummary>,
}

#[derive(Deserialize)]
struct RequestsBody {
    requests: Vec<FriendRequest>,
}

#[derive(Serialize)]
struct UsernameBody<'a> {
    username: &'a str,
}

#[derive(Serialize)]
struct RequestIdBody<'a> {
    request_id: &'a str,
}

#[derive(Serialize)]
struct ContactIdBody<'a> {
    contact_id: &'a str,
}

impl ApiClient {
    pub async fn get_contacts(&self) -> ClientResult<Vec<Contact>> {
        let body: ContactsBody = self.get("/api/contacts").await?.json().await?;
        debug!("Fetched {} contacts", body.contacts.len());
        Ok(body.contacts)
    }

    /// `GET /api/users/search?q=`; the query is percent-encoded.
    pub async fn search_users(&self, query: &str) -> ClientResult<Vec<UserSummary>> {
        let mut url = self.endpoint("/api/users/search")?;
        url.query_pairs_mut().append_pair("q", query);
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        let body: UsersBody = Self::check(resp).await?.json().await?;
        Ok(body.users)
    }

    pub async fn send_friend_request(&self, username: &str) -> ClientResult<()> {
        self.post_json("/api/friend-requests/send", &UsernameBody { username })
            .await?;
        info!("Friend request sent to {}", username);
        Ok(())
    }

    pub async fn get_pending_requests(&self) -> ClientResult<Vec<FriendRequest>> {
        let body: RequestsBody = self.get("/api/friend-requests/pending").await?.json().await?;
        Ok(body.requests)
    }

    /// `decision` is the last path segment: `accept` or `reject`.
    pub(crate) async fn answer_request(&self, decision: &str, request_id: &str) -> ClientResult<()> {
        let path = format!("/api/friend-requests/{}", decision);
        self.post_json(&path, &RequestIdBody { request_id }).await?;
        info!("Friend request {} answered: {}", request_id, decision);
        Ok(())
    }

    pub async fn remove_contact(&self, contact_id: &str) -> ClientResult<()> {
        self.post_json("/api/contacts/remove", &ContactIdBody { contact_id })
            .await?;
        info!("Removed contact {}", contact_id);
        Ok(())
    }
}
