// Contact list, pending friend requests and the user search box

use log::debug;

use crate::models::{Contact, FriendRequest, UserSummary, MIN_SEARCH_LEN};

/// What the caller should do after the search query changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPlan {
    /// Query too short: results were cleared and no request should go out.
    Cleared,
    /// Issue a (debounced) search for this query.
    Scheduled(String),
}

/// Which list a cursor movement applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelList {
    Results,
    Requests,
    Contacts,
}

#[derive(Default)]
pub struct ContactPanel {
    query: String,
    results: Vec<UserSummary>,
    show_dropdown: bool,
    contacts: Vec<Contact>,
    requests: Vec<FriendRequest>,
    result_cursor: usize,
    request_cursor: usize,
    contact_cursor: usize,
}

impl ContactPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[UserSummary] {
        &self.results
    }

    pub fn show_dropdown(&self) -> bool {
        self.show_dropdown
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn requests(&self) -> &[FriendRequest] {
        &self.requests
    }

    /// Record the new query. Short queries clear results right away.
    pub fn on_query_changed(&mut self, query: &str) -> SearchPlan {
        self.query = query.to_string();
        if query.chars().count() >= MIN_SEARCH_LEN {
            SearchPlan::Scheduled(self.query.clone())
        } else {
            self.results.clear();
            self.show_dropdown = false;
            self.result_cursor = 0;
            SearchPlan::Cleared
        }
    }

    /// Results for `query`; dropped if the box has moved on since.
    pub fn apply_search_results(&mut self, query: &str, users: Vec<UserSummary>) {
        if query != self.query {
            debug!("Dropping results for stale query {:?}", query);
            return;
        }
        self.show_dropdown = !users.is_empty();
        self.results = users;
        self.result_cursor = 0;
    }

    pub fn clear_search(&mut self) {
        self.query.clear();
        self.results.clear();
        self.show_dropdown = false;
        self.result_cursor = 0;
    }

    pub fn set_contacts(&mut self, contacts: Vec<Contact>) {
        self.contacts = contacts;
        self.contact_cursor = clamp(self.contact_cursor, self.contacts.len());
    }

    pub fn set_requests(&mut self, requests: Vec<FriendRequest>) {
        self.requests = requests;
        self.request_cursor = clamp(self.request_cursor, self.requests.len());
    }

    pub fn contact(&self, id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    /// Flip a contact's presence in place. Returns the updated contact.
    pub fn set_online(&mut self, user_id: &str, online: bool) -> Option<Contact> {
        let contact = self.contacts.iter_mut().find(|c| c.id == user_id)?;
        contact.online = online;
        Some(contact.clone())
    }

    pub fn select_next(&mut self, list: PanelList) {
        self.move_cursor(list, true);
    }

    pub fn select_prev(&mut self, list: PanelList) {
        self.move_cursor(list, false);
    }

    fn move_cursor(&mut self, list: PanelList, down: bool) {
        let (cursor, len) = match list {
            PanelList::Results => (&mut self.result_cursor, self.results.len()),
            PanelList::Requests => (&mut self.request_cursor, self.requests.len()),
            PanelList::Contacts => (&mut self.contact_cursor, self.contacts.len()),
        };
        if len == 0 {
            *cursor = 0;
        } else if down {
            *cursor = (*cursor + 1) % len;
        } else {
            *cursor = (*cursor + len - 1) % len;
        }
    }

    pub fn cursor(&self, list: PanelList) -> usize {
        match list {
            PanelList::Results => self.result_cursor,
            PanelList::Requests => self.request_cursor,
            PanelList::Contacts => self.contact_cursor,
        }
    }

    pub fn highlighted_result(&self) -> Option<&UserSummary> {
        self.results.get(self.result_cursor)
    }

    pub fn highlighted_request(&self) -> Option<&FriendRequest> {
        self.requests.get(self.request_cursor)
    }

    pub fn highlighted_contact(&self) -> Option<&Contact> {
        self.contacts.get(self.contact_cursor)
    }
}

fn clamp(cursor: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        cursor.min(len - 1)
    }
}
