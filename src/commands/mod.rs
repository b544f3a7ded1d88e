/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `auth` — login, logout, and status handlers built on the auth subsystem
*/

pub mod auth;
