/// Resume information for one shard's gateway session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub session_id: Option<String>,
    pub last_sequence: Option<u64>,
    // url to use when resuming, handed to us by READY
    pub resume_url: Option<String>,
}

impl Session {
    /// Capture the session from a fresh READY.
    pub fn start(&mut self, session_id: String, resume_url: Option<String>) {
        self.session_id = Some(session_id);
        self.resume_url = resume_url;
    }

    /// Track the latest sequence number, the stored sequence never goes backwards.
    pub fn observe_sequence(&mut self, sequence: u64) {
        if self.last_sequence.map_or(true, |last| sequence > last) {
            self.last_sequence = Some(sequence);
        }
    }

    pub fn can_resume(&self) -> bool {
        self.session_id.is_some()
    }

    /// Forget everything, the next connection will identify from scratch.
    pub fn clear(&mut self) {
        self.session_id = None;
        self.last_sequence = None;
        self.resume_url = None;
    }

    /// Where to connect: the resume url while we have a session, the regular gateway otherwise.
    pub fn connect_url<'a>(&'a self, gateway_url: &'a str) -> &'a str {
        match (&self.session_id, &self.resume_url) {
            (Some(_), Some(resume_url)) => resume_url,
            _ => gateway_url,
        }
    }
}
