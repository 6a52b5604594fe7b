mod gitlab;

pub use gitlab::GitLabProvider;
