mod comments;
mod users;
