#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    GetTime {
        message: String,
        t0_ms: i64,
        leader_address: String,
    },
    UpdateTime {
        message: String,
        delta_ms: i64,
        leader_address: String,
    },
    Close {
        message: String,
        leader_address: String,
    },
}

impl Request {
    pub fn operation(&self) -> &'static str {
        match self {
            Request::GetTime { .. } => "GET_TIME",
            Request::UpdateTime { .. } => "UPDATE_TIME",
            Request::Close { .. } => "CLOSE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Poll {
        follower_name: String,
        local_time_ms: i64,
        address_follower: String,
    },
    Updated {
        follower_name: String,
        local_time_ms: i64,
    },
    Closed {
        follower_name: String,
    },
    Error {
        error: String,
    },
}
