pub mod impersonation;
